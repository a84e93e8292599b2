use super::error::MulError;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::io::BufRead;

/// Two-way mapping between gene copy labels and species labels, read from
/// an ASTRAL-multi style map file with one record per line:
///
/// ```text
/// species_name:gene_name_1,gene_name_2,...
/// ```
///
/// Species are assigned dense ordinals in file order; species profile
/// bitsets are indexed by these ordinals. The first gene listed for a
/// species is its canonical copy, the one kept when duplicates are pruned.
#[derive(Debug, Default, Clone)]
pub struct LabelMap {
    /// species -> ordered gene copies; insertion order fixes the ordinals
    s2g: IndexMap<String, Vec<String>>,
    /// gene copy -> species ordinal
    g2s: HashMap<String, usize>,
}

impl LabelMap {
    /// Read a label map from a file (or "stdin").
    pub fn from_file(infile: &str) -> anyhow::Result<Self> {
        Ok(Self::from_reader(crate::libs::io::reader(infile)?)?)
    }

    /// Read a label map from any buffered reader.
    ///
    /// If a gene copy appears in more than one record, the last binding
    /// wins (implementation-defined).
    ///
    /// # Example
    /// ```
    /// use mulrfs::libs::multree::labels::LabelMap;
    ///
    /// let map = LabelMap::from_reader("A:a1,a2\nB:b1\n".as_bytes()).unwrap();
    /// assert_eq!(map.species_count(), 2);
    /// assert_eq!(map.species_name(0), "A");
    /// assert_eq!(map.canonical_gene(0), "a1");
    /// assert_eq!(map.species_of("a2").unwrap(), 0);
    /// assert!(map.species_of("zz").is_err());
    /// ```
    pub fn from_reader(reader: impl BufRead) -> Result<Self, MulError> {
        let mut map = Self::default();

        for (i, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(l) => l,
                Err(_) => {
                    return Err(MulError::MalformedMap {
                        line: i + 1,
                        text: "<unreadable>".to_string(),
                    })
                }
            };
            if line.is_empty() {
                continue;
            }

            let (species, genes) = match line.split_once(':') {
                Some((s, g)) if !s.is_empty() => (s, g),
                _ => {
                    return Err(MulError::MalformedMap {
                        line: i + 1,
                        text: line.clone(),
                    })
                }
            };

            let genes: Vec<String> = genes.split(',').map(|g| g.to_string()).collect();

            let ord = match map.s2g.get_index_of(species) {
                Some(ord) => ord,
                None => {
                    map.s2g.insert(species.to_string(), Vec::new());
                    map.s2g.len() - 1
                }
            };
            for gene in &genes {
                map.g2s.insert(gene.clone(), ord);
            }
            map.s2g[ord] = genes;
        }

        // A gene copy label equal to any species label would make leaf
        // labels ambiguous.
        for species in map.s2g.keys() {
            if map.g2s.contains_key(species) {
                return Err(MulError::LabelCollision {
                    label: species.clone(),
                });
            }
        }

        Ok(map)
    }

    /// Number of species declared in the map
    pub fn species_count(&self) -> usize {
        self.s2g.len()
    }

    /// Species label for an ordinal
    pub fn species_name(&self, ord: usize) -> &str {
        self.s2g.get_index(ord).map(|(s, _)| s.as_str()).unwrap()
    }

    /// The canonical (first-listed) gene copy of a species
    pub fn canonical_gene(&self, ord: usize) -> &str {
        self.s2g
            .get_index(ord)
            .and_then(|(_, genes)| genes.first())
            .map(|g| g.as_str())
            .unwrap()
    }

    /// Resolve a leaf label to a species ordinal. Accepts gene copy labels
    /// and bare species labels (leaves of an already-relabeled tree).
    pub fn species_of(&self, label: &str) -> Result<usize, MulError> {
        if let Some(&ord) = self.g2s.get(label) {
            return Ok(ord);
        }
        if let Some(ord) = self.s2g.get_index_of(label) {
            return Ok(ord);
        }
        Err(MulError::UnknownGene {
            label: label.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_basic() {
        let map = LabelMap::from_reader("A:a1,a2\nB:b1\nC:c1\nD:d1\n".as_bytes()).unwrap();

        assert_eq!(map.species_count(), 4);
        assert_eq!(map.species_name(0), "A");
        assert_eq!(map.species_name(3), "D");
        assert_eq!(map.canonical_gene(0), "a1");
        assert_eq!(map.canonical_gene(1), "b1");

        assert_eq!(map.species_of("a1").unwrap(), 0);
        assert_eq!(map.species_of("a2").unwrap(), 0);
        assert_eq!(map.species_of("d1").unwrap(), 3);

        // Bare species labels resolve to their own ordinal
        assert_eq!(map.species_of("B").unwrap(), 1);
    }

    #[test]
    fn test_map_trailing_blank_lines() {
        let map = LabelMap::from_reader("A:a1\nB:b1\n\n\n".as_bytes()).unwrap();
        assert_eq!(map.species_count(), 2);
    }

    #[test]
    fn test_map_missing_separator() {
        let err = LabelMap::from_reader("A:a1\nBb1\n".as_bytes()).unwrap_err();
        assert_eq!(
            err,
            MulError::MalformedMap {
                line: 2,
                text: "Bb1".to_string()
            }
        );
    }

    #[test]
    fn test_map_collision() {
        // Gene copy "B" collides with species "B"
        let err = LabelMap::from_reader("A:a1,B\nB:b1\n".as_bytes()).unwrap_err();
        assert_eq!(
            err,
            MulError::LabelCollision {
                label: "B".to_string()
            }
        );
    }

    #[test]
    fn test_map_unknown_gene() {
        let map = LabelMap::from_reader("A:a1\n".as_bytes()).unwrap();
        assert_eq!(
            map.species_of("x9").unwrap_err(),
            MulError::UnknownGene {
                label: "x9".to_string()
            }
        );
    }
}
