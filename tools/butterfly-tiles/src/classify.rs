//! Splits way tags into an interned routing profile and metadata.

use crate::error::{LoadError, Result};
use crate::store::GraphStore;
use crate::tags::TagSet;
use crate::vehicles::VehicleCapability;
use tracing::info;

/// Interned attribute ids carried by every edge of a way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeAttributes {
    pub profile: u32,
    pub meta: u32,
}

pub struct TagClassifier<'a, C: VehicleCapability + ?Sized> {
    capability: &'a C,
}

impl<'a, C: VehicleCapability + ?Sized> TagClassifier<'a, C> {
    pub fn new(capability: &'a C) -> Self {
        Self { capability }
    }

    /// Classifies a way's tags.
    ///
    /// Returns `Ok(None)` when no configured vehicle recognizes or may use the
    /// way. Whitelisted keys form the profile; keys some vehicle considers
    /// routing or meta relevant, but not whitelisted for this way, go to the
    /// metadata; everything else is dropped.
    pub fn classify<S: GraphStore + ?Sized>(
        &self,
        store: &mut S,
        tags: &TagSet,
    ) -> Result<Option<EdgeAttributes>> {
        let Some(whitelist) = self.capability.whitelist(tags) else {
            return Ok(None);
        };

        let mut profile_tags = TagSet::new();
        let mut meta_tags = TagSet::new();
        for (key, value) in tags.iter() {
            if whitelist.contains(key) {
                profile_tags.insert(key, value);
            } else if self.capability.is_profile_relevant(key)
                || self.capability.is_meta_relevant(key)
            {
                meta_tags.insert(key, value);
            }
        }

        if !self.capability.can_traverse(&profile_tags) {
            return Ok(None);
        }

        let profile = match store.profile_id(&profile_tags) {
            Some(profile) => profile,
            None => {
                let known = store.profile_count();
                let max = store.max_profile_count();
                if known >= max {
                    return Err(LoadError::ProfileOverflow {
                        count: known + 1,
                        max,
                    });
                }
                let profile = store.intern_profile(&profile_tags);
                info!(profiles = known + 1, profile = %profile_tags, "new edge profile");
                profile
            }
        };

        let meta = store.intern_meta(&meta_tags);
        Ok(Some(EdgeAttributes { profile, meta }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RouterDb;
    use crate::vehicles::VehicleSet;

    fn tags(pairs: &[(&str, &str)]) -> TagSet {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_splits_profile_and_meta() {
        let vehicles = VehicleSet::from_names(&["car"]).unwrap();
        let classifier = TagClassifier::new(&vehicles);
        let mut db = RouterDb::new();

        let way = tags(&[
            ("highway", "residential"),
            ("maxspeed", "30"),
            ("name", "Main Street"),
            ("building", "yes"),
        ]);
        let attributes = classifier.classify(&mut db, &way).unwrap().unwrap();

        assert_eq!(
            db.profile(attributes.profile),
            Some(&tags(&[("highway", "residential"), ("maxspeed", "30")]))
        );
        assert_eq!(
            db.meta(attributes.meta),
            Some(&tags(&[("name", "Main Street")]))
        );
    }

    #[test]
    fn test_equal_profiles_share_ids() {
        let vehicles = VehicleSet::all();
        let classifier = TagClassifier::new(&vehicles);
        let mut db = RouterDb::new();

        let a = classifier
            .classify(&mut db, &tags(&[("highway", "primary"), ("name", "A")]))
            .unwrap()
            .unwrap();
        let b = classifier
            .classify(&mut db, &tags(&[("highway", "primary"), ("name", "B")]))
            .unwrap()
            .unwrap();

        assert_eq!(a.profile, b.profile);
        assert_ne!(a.meta, b.meta);
        assert_eq!(db.profile_count(), 1);
    }

    #[test]
    fn test_rejects_untraversable() {
        let vehicles = VehicleSet::from_names(&["car"]).unwrap();
        let classifier = TagClassifier::new(&vehicles);
        let mut db = RouterDb::new();

        let footway = tags(&[("highway", "footway")]);
        assert_eq!(classifier.classify(&mut db, &footway).unwrap(), None);
        let building = tags(&[("building", "yes")]);
        assert_eq!(classifier.classify(&mut db, &building).unwrap(), None);
        assert_eq!(db.profile_count(), 0);
    }

    #[test]
    fn test_profile_key_outside_whitelist_goes_to_meta() {
        // Only the pedestrian recognizes steps, but `maxspeed` is a car key.
        let vehicles = VehicleSet::from_names(&["foot", "car"]).unwrap();
        let classifier = TagClassifier::new(&vehicles);
        let mut db = RouterDb::new();

        let attributes = classifier
            .classify(
                &mut db,
                &tags(&[("highway", "steps"), ("maxspeed", "5"), ("foot", "yes")]),
            )
            .unwrap()
            .unwrap();
        let profile = db.profile(attributes.profile).unwrap();
        assert_eq!(profile.get("foot"), Some("yes"));
        assert_eq!(profile.get("maxspeed"), None);
        assert_eq!(db.meta(attributes.meta).unwrap().get("maxspeed"), Some("5"));
    }

    #[test]
    fn test_profile_overflow() {
        let vehicles = VehicleSet::all();
        let classifier = TagClassifier::new(&vehicles);
        let mut db = RouterDb::with_max_profile_count(2);

        for speed in ["30", "50"] {
            classifier
                .classify(&mut db, &tags(&[("highway", "primary"), ("maxspeed", speed)]))
                .unwrap();
        }
        let err = classifier
            .classify(&mut db, &tags(&[("highway", "primary"), ("maxspeed", "70")]))
            .unwrap_err();
        assert!(matches!(err, LoadError::ProfileOverflow { count: 3, max: 2 }));
        assert!(err.is_fatal());
        assert_eq!(db.profile_count(), 2);
        assert!(db.profile(2).is_none());

        // Already interned profiles still classify
        assert!(classifier
            .classify(&mut db, &tags(&[("highway", "primary"), ("maxspeed", "30")]))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_overflow_leaves_dictionary_within_bounds() {
        let vehicles = VehicleSet::all();
        let classifier = TagClassifier::new(&vehicles);
        let mut db = RouterDb::with_max_profile_count(1);

        classifier
            .classify(&mut db, &tags(&[("highway", "primary")]))
            .unwrap();
        let err = classifier
            .classify(&mut db, &tags(&[("highway", "residential")]))
            .unwrap_err();

        assert!(matches!(err, LoadError::ProfileOverflow { count: 2, max: 1 }));
        assert!(db.profile_count() <= db.max_profile_count());
        assert_eq!(db.meta_count(), 1);
    }
}
