use super::{ElementFactory, Rank, Registry, UnitClass};

/// Which registry entries are eligible for automatic selection
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogFilter {
    /// Entries below this rank are dropped
    pub min_rank: Rank,
    /// Entries whose class is not listed are dropped
    pub classes: Vec<UnitClass>,
}

impl Default for CatalogFilter {
    fn default() -> Self {
        CatalogFilter {
            min_rank: Rank::MARGINAL,
            classes: UnitClass::ALL.to_vec(),
        }
    }
}

impl CatalogFilter {
    /// Whether a factory passes the filter
    pub fn accepts(&self, factory: &ElementFactory) -> bool {
        let class_ok = factory
            .class()
            .is_some_and(|class| self.classes.contains(&class));
        class_ok && factory.rank >= self.min_rank
    }
}

/// Candidate units for autoplugging, highest rank first.
///
/// Built once and never modified afterwards.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<ElementFactory>,
}

impl Catalog {
    /// Filter the registry and sort the survivors by descending rank.
    ///
    /// The sort is stable, so entries of equal rank keep registry order.
    pub fn build(registry: &Registry, filter: &CatalogFilter) -> Self {
        let mut entries: Vec<ElementFactory> = registry
            .factories()
            .iter()
            .filter(|f| filter.accepts(f))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.rank.cmp(&a.rank));

        log::debug!(
            "Catalog holds {} of {} registered factories",
            entries.len(),
            registry.len()
        );
        Catalog { entries }
    }

    /// Entries in selection order
    pub fn iter(&self) -> std::slice::Iter<'_, ElementFactory> {
        self.entries.iter()
    }

    /// Entries as a slice
    pub fn entries(&self) -> &[ElementFactory] {
        &self.entries
    }

    /// Look up an entry by factory name
    pub fn get(&self, name: &str) -> Option<&ElementFactory> {
        self.entries.iter().find(|f| f.name == name)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no unit is eligible
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a ElementFactory;
    type IntoIter = std::slice::Iter<'a, ElementFactory>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::new(vec![
            ElementFactory::new("mad", "Codec/Decoder/Audio", Rank::SECONDARY),
            ElementFactory::new("alsasink", "Sink/Audio", Rank::PRIMARY),
            ElementFactory::new("oggdemux", "Codec/Demuxer", Rank::PRIMARY),
            ElementFactory::new("vorbisparse", "Codec/Parser/Audio", Rank::NONE),
            ElementFactory::new("flacparse", "Codec/Parser/Audio", Rank(257)),
            ElementFactory::new("odd", "Codec/Decoder/Audio", Rank(63)),
            ElementFactory::new("edge", "Codec/Decoder/Audio", Rank::MARGINAL),
            ElementFactory::new("audioconvert", "Filter/Converter/Audio", Rank::PRIMARY),
        ])
        .unwrap()
    }

    #[test]
    fn test_filter_by_class_and_rank() {
        let catalog = Catalog::build(&registry(), &CatalogFilter::default());
        let mut names: Vec<&str> = catalog.iter().map(|f| f.name.as_str()).collect();
        names.sort();
        assert_eq!(names, ["edge", "flacparse", "mad", "oggdemux"]);
        assert!(catalog.get("alsasink").is_none());
        assert!(catalog.get("vorbisparse").is_none());
        assert!(catalog.get("odd").is_none());
    }

    #[test]
    fn test_sorted_by_descending_rank() {
        let catalog = Catalog::build(&registry(), &CatalogFilter::default());
        for pair in catalog.entries().windows(2) {
            assert!(pair[0].rank >= pair[1].rank);
        }
        assert_eq!(catalog.entries()[0].name, "flacparse");
    }

    #[test]
    fn test_custom_filter() {
        let filter = CatalogFilter {
            min_rank: Rank::PRIMARY,
            classes: vec![UnitClass::Demuxer],
        };
        let catalog = Catalog::build(&registry(), &filter);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.entries()[0].name, "oggdemux");
    }

    #[test]
    fn test_empty_registry() {
        let catalog = Catalog::build(&Registry::default(), &CatalogFilter::default());
        assert!(catalog.is_empty());
    }
}
