//! Attribute filtering of file candidates.

use fastsearch_core::{FileCandidate, SearchCriteria};

/// Outcome of evaluating a candidate against the criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// At least one configured attribute group failed.
    Reject,
    /// Every configured group passed and no content words are configured.
    Accept,
    /// Every configured attribute group passed; a content scan decides.
    DeferToContentSearch,
}

/// Stateless evaluation of candidates against a [`SearchCriteria`].
///
/// Groups are checked in a fixed order (prefix, suffix, name substring,
/// modified time, size, access) and the first failing group rejects the
/// candidate without evaluating the rest.
#[derive(Debug, Clone, Copy)]
pub struct FilterPipeline<'a> {
    criteria: &'a SearchCriteria,
}

impl<'a> FilterPipeline<'a> {
    /// Create a pipeline over the given criteria.
    pub fn new(criteria: &'a SearchCriteria) -> Self {
        Self { criteria }
    }

    /// The criteria this pipeline evaluates.
    pub fn criteria(&self) -> &'a SearchCriteria {
        self.criteria
    }

    /// Evaluate a single candidate.
    pub fn evaluate(&self, candidate: &FileCandidate) -> Decision {
        let c = self.criteria;
        let name = candidate.name.as_str();

        if !c.name_prefixes.is_empty() && !c.name_prefixes.iter().any(|p| name.starts_with(p.as_str())) {
            return Decision::Reject;
        }

        if !c.name_suffixes.is_empty() && !c.name_suffixes.iter().any(|s| name.ends_with(s.as_str())) {
            return Decision::Reject;
        }

        if !c.name_substrings.is_empty() && !c.name_substrings.iter().any(|s| name.contains(s.as_str())) {
            return Decision::Reject;
        }

        if let Some(range) = c.modified_range {
            if !range.contains(candidate.modified_millis) {
                return Decision::Reject;
            }
        }

        if let Some(range) = c.size_range {
            if !range.contains(candidate.size) {
                return Decision::Reject;
            }
        }

        if !c.access.iter().all(|right| candidate.grants(*right)) {
            return Decision::Reject;
        }

        if c.needs_content_search() {
            Decision::DeferToContentSearch
        } else {
            Decision::Accept
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastsearch_core::{AccessRight, ModifiedRange, SearchCriteriaBuilder, SizeRange};
    use std::collections::BTreeSet;

    fn base() -> SearchCriteriaBuilder {
        let mut builder = SearchCriteria::builder();
        builder.roots(vec![std::path::PathBuf::from("/root")]);
        builder
    }

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_prefix_is_disjunction() {
        let criteria = base().name_prefixes(words(&["img_", "photo_"])).build().unwrap();
        let pipeline = FilterPipeline::new(&criteria);

        assert_eq!(pipeline.evaluate(&FileCandidate::new("/r/img_1.png", 1, 1)), Decision::Accept);
        assert_eq!(pipeline.evaluate(&FileCandidate::new("/r/photo_1.png", 1, 1)), Decision::Accept);
        assert_eq!(pipeline.evaluate(&FileCandidate::new("/r/doc.png", 1, 1)), Decision::Reject);
    }

    #[test]
    fn test_suffix_and_substring() {
        let criteria = base()
            .name_suffixes(words(&[".log"]))
            .name_substrings(words(&["error"]))
            .build()
            .unwrap();
        let pipeline = FilterPipeline::new(&criteria);

        assert_eq!(pipeline.evaluate(&FileCandidate::new("/r/app-error.log", 1, 1)), Decision::Accept);
        assert_eq!(pipeline.evaluate(&FileCandidate::new("/r/app-info.log", 1, 1)), Decision::Reject);
        assert_eq!(pipeline.evaluate(&FileCandidate::new("/r/error.txt", 1, 1)), Decision::Reject);
    }

    #[test]
    fn test_size_group_rejects_despite_prefix() {
        let criteria = base()
            .name_prefixes(words(&["img_"]))
            .size_range(SizeRange::new(0, 1000))
            .build()
            .unwrap();
        let pipeline = FilterPipeline::new(&criteria);

        assert_eq!(pipeline.evaluate(&FileCandidate::new("/r/img_001.png", 2000, 1)), Decision::Reject);
        assert_eq!(pipeline.evaluate(&FileCandidate::new("/r/img_001.png", 1000, 1)), Decision::Accept);
    }

    #[test]
    fn test_modified_range_inclusive() {
        let criteria = base().modified_range(ModifiedRange::new(100, 200)).build().unwrap();
        let pipeline = FilterPipeline::new(&criteria);

        assert_eq!(pipeline.evaluate(&FileCandidate::new("/r/a", 0, 100)), Decision::Accept);
        assert_eq!(pipeline.evaluate(&FileCandidate::new("/r/a", 0, 200)), Decision::Accept);
        assert_eq!(pipeline.evaluate(&FileCandidate::new("/r/a", 0, 201)), Decision::Reject);
    }

    #[test]
    fn test_access_is_conjunction() {
        let criteria = base()
            .access(BTreeSet::from([AccessRight::Readable, AccessRight::Executable]))
            .build()
            .unwrap();
        let pipeline = FilterPipeline::new(&criteria);

        let both = FileCandidate::new("/r/a", 0, 1).with_access(true, false, true);
        let read_only = FileCandidate::new("/r/a", 0, 1).with_access(true, false, false);
        assert_eq!(pipeline.evaluate(&both), Decision::Accept);
        assert_eq!(pipeline.evaluate(&read_only), Decision::Reject);
    }

    #[test]
    fn test_content_words_defer_only_after_attributes() {
        let criteria = base()
            .name_suffixes(words(&[".txt"]))
            .content_words(words(&["hello"]))
            .build()
            .unwrap();
        let pipeline = FilterPipeline::new(&criteria);

        assert_eq!(
            pipeline.evaluate(&FileCandidate::new("/r/a.txt", 50, 1)),
            Decision::DeferToContentSearch
        );
        assert_eq!(pipeline.evaluate(&FileCandidate::new("/r/a.md", 50, 1)), Decision::Reject);
    }

    #[test]
    fn test_content_only_criteria_defers_everything() {
        let criteria = base().content_words(words(&["x"])).build().unwrap();
        let pipeline = FilterPipeline::new(&criteria);

        assert_eq!(
            pipeline.evaluate(&FileCandidate::new("/r/anything", 0, 1)),
            Decision::DeferToContentSearch
        );
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let criteria = base()
            .name_prefixes(words(&["a"]))
            .size_range(SizeRange::new(1, 10))
            .build()
            .unwrap();
        let pipeline = FilterPipeline::new(&criteria);
        let candidate = FileCandidate::new("/r/abc", 5, 1);

        let first = pipeline.evaluate(&candidate);
        for _ in 0..10 {
            assert_eq!(pipeline.evaluate(&candidate), first);
        }
    }
}
