
use std::fmt;

/// An ordered tuple of per-locus genotype values across a fixed locus set.
/// A slot is None when the locus was not compared for the sample; two samples share a
/// pattern only when every slot matches, None included.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct HaplotypePattern(Vec<Option<String>>);

impl HaplotypePattern {
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Option<String>] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for HaplotypePattern {
    // compact form for logs, e.g. "C580Y|K76T|."
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots: Vec<&str> = self.0.iter()
            .map(|v| v.as_deref().unwrap_or("."))
            .collect();
        write!(f, "{}", slots.join("|"))
    }
}
