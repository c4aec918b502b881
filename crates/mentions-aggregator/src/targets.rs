//! Fetch-target collection.
//!
//! Every distinct brand or competitor name (trimmed, case-insensitive) becomes
//! one [`FetchTarget`], so a name tracked by several brands is fetched once and
//! fanned out to all of its subscribers.

use std::collections::HashMap;
use std::sync::Arc;

use mentions_core::TrackedBrand;

use crate::types::{FetchTarget, Subscriber};

/// Build deduplicated fetch targets, in first-seen order.
#[must_use]
pub fn collect_targets(brands: &[Arc<TrackedBrand>]) -> Vec<FetchTarget> {
    let mut targets: Vec<FetchTarget> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for brand in brands {
        let own_keywords = (!brand.keywords.is_empty()).then(|| brand.keywords.clone());
        if let Some(target) = upsert(&mut targets, &mut index, &brand.name, own_keywords) {
            target.subscribers.push(Subscriber {
                brand: Arc::clone(brand),
                is_competitor: false,
                competitor_id: None,
                competitor_name: None,
            });
        }

        for competitor in &brand.competitors {
            if let Some(target) = upsert(
                &mut targets,
                &mut index,
                &competitor.name,
                competitor.keywords.clone(),
            ) {
                target.subscribers.push(Subscriber {
                    brand: Arc::clone(brand),
                    is_competitor: true,
                    competitor_id: Some(competitor.id.clone()),
                    competitor_name: Some(competitor.name.clone()),
                });
            }
        }
    }

    targets
}

fn upsert<'a>(
    targets: &'a mut Vec<FetchTarget>,
    index: &mut HashMap<String, usize>,
    name: &str,
    keywords: Option<Vec<String>>,
) -> Option<&'a mut FetchTarget> {
    let keyword = name.trim();
    let key = keyword.to_lowercase();
    if key.is_empty() {
        tracing::warn!("skipping fetch target with an empty name");
        return None;
    }

    let slot = *index.entry(key.clone()).or_insert_with(|| {
        targets.push(FetchTarget {
            key,
            keyword: keyword.to_string(),
            keywords,
            subscribers: Vec::new(),
        });
        targets.len() - 1
    });
    targets.get_mut(slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentions_core::Competitor;

    fn competitor(name: &str, keywords: Option<&[&str]>) -> Competitor {
        Competitor {
            id: name.to_lowercase(),
            name: name.to_string(),
            keywords: keywords.map(|k| k.iter().map(ToString::to_string).collect()),
        }
    }

    fn brand(name: &str, competitors: Vec<Competitor>) -> Arc<TrackedBrand> {
        let mut b = TrackedBrand::named(name.to_lowercase(), name);
        b.competitors = competitors;
        Arc::new(b)
    }

    #[test]
    fn brand_without_competitors_yields_one_target() {
        let targets = collect_targets(&[brand("Acme", vec![])]);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].key, "acme");
        assert_eq!(targets[0].subscribers.len(), 1);
        assert!(!targets[0].subscribers[0].is_competitor);
    }

    #[test]
    fn shared_competitor_is_fetched_once_with_every_subscriber() {
        let brands = [
            brand("Acme", vec![competitor("Globex", Some(&["globex", "globexcorp"]))]),
            brand("Initech", vec![competitor(" globex ", None)]),
        ];
        let targets = collect_targets(&brands);
        let keys: Vec<&str> = targets.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["acme", "globex", "initech"]);

        let globex = &targets[1];
        assert_eq!(globex.keyword, "Globex");
        assert_eq!(globex.subscribers.len(), 2);
        assert!(globex.subscribers.iter().all(|s| s.is_competitor));
        assert_eq!(globex.subscribers[0].brand.name, "Acme");
        assert_eq!(globex.subscribers[1].brand.name, "Initech");
        // First upsert decides the keyword override.
        assert_eq!(
            globex.keywords.as_deref(),
            Some(&["globex".to_string(), "globexcorp".to_string()][..])
        );
    }

    #[test]
    fn competitor_named_like_a_brand_merges_roles() {
        let brands = [
            brand("Acme", vec![competitor("Initech", None)]),
            brand("INITECH", vec![]),
        ];
        let targets = collect_targets(&brands);
        assert_eq!(targets.len(), 2);
        let initech = targets.iter().find(|t| t.key == "initech").unwrap();
        assert_eq!(initech.subscribers.len(), 2);
        assert!(initech.subscribers[0].is_competitor);
        assert!(!initech.subscribers[1].is_competitor);
    }

    #[test]
    fn subscriber_count_equals_role_references() {
        let brands = [
            brand("Acme", vec![competitor("Globex", None), competitor("Umbrella", None)]),
            brand("Globex", vec![competitor("Acme", None)]),
            brand("Umbrella", vec![competitor("globex", None)]),
        ];
        let targets = collect_targets(&brands);
        assert_eq!(targets.len(), 3);
        let total: usize = targets.iter().map(|t| t.subscribers.len()).sum();
        assert_eq!(total, 7);
        let globex = targets.iter().find(|t| t.key == "globex").unwrap();
        assert_eq!(globex.subscribers.len(), 3);
    }

    #[test]
    fn competitor_subscriber_profile_uses_competitor_terms() {
        let targets = collect_targets(&[brand(
            "Acme",
            vec![competitor("Globex", Some(&["globexcorp"]))],
        )]);
        let sub = &targets[1].subscribers[0];
        let profile = sub.matching_profile();
        assert_eq!(profile.name, "Globex");
        assert_eq!(profile.keywords, vec!["globexcorp".to_string()]);
        assert_eq!(profile.id, "acme:globex");
    }

    #[test]
    fn fetch_descriptor_comes_from_target() {
        let targets = collect_targets(&[brand(
            "Acme",
            vec![competitor("Globex", Some(&["globexcorp"]))],
        )]);
        let descriptor = targets[1].fetch_descriptor();
        assert_eq!(descriptor.name, "Globex");
        assert_eq!(descriptor.keywords, vec!["globexcorp".to_string()]);
        assert!(descriptor.exclude_keywords.is_empty());
    }
}
