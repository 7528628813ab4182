//! Record metadata and search predicates.

use serde::{Deserialize, Serialize};

use fst_common::level::LevelCode;
use fst_common::time::NativeStamp;

/// Metadata of one record in a standard file.
///
/// Immutable once read from a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Variable name, e.g. "TT", "UU", "P0".
    pub nomvar: String,
    /// Type-of-variable tag.
    pub typvar: String,
    /// Production label.
    pub etiket: String,
    /// Validity timestamp code.
    pub datev: NativeStamp,
    /// Vertical-level code.
    pub ip1: LevelCode,
    /// Second discriminator (typically the forecast hour).
    pub ip2: u32,
    /// Third discriminator.
    pub ip3: u32,
    /// Grid-type tag ('L', 'E', 'U').
    pub grtyp: char,
    /// Grid identifier triplet.
    pub grid_id: (u32, u32, u32),
    /// Columns.
    pub ni: usize,
    /// Rows.
    pub nj: usize,
}

impl RecordMetadata {
    /// Payload shape as (rows, columns).
    pub fn shape(&self) -> (usize, usize) {
        (self.nj, self.ni)
    }

    /// True when `other` belongs to the same field and differs at most by
    /// vertical level.
    pub fn level_sibling_of(&self, other: &RecordMetadata) -> bool {
        self.nomvar == other.nomvar
            && self.typvar == other.typvar
            && self.etiket == other.etiket
            && self.datev == other.datev
            && self.ip2 == other.ip2
            && self.ip3 == other.ip3
            && self.grid_id == other.grid_id
    }
}

/// Search predicate over record metadata. `None` fields match anything.
///
/// Validity is matched within the stamp tolerance window; every other
/// field matches exactly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordQuery {
    pub nomvar: Option<String>,
    pub typvar: Option<String>,
    pub etiket: Option<String>,
    pub datev: Option<NativeStamp>,
    pub ip1: Option<LevelCode>,
    pub ip2: Option<u32>,
    pub ip3: Option<u32>,
    pub grid_id: Option<(u32, u32, u32)>,
}

impl RecordQuery {
    /// Predicate matching records of one variable.
    pub fn variable(nomvar: impl Into<String>) -> Self {
        Self {
            nomvar: Some(nomvar.into()),
            ..Self::default()
        }
    }

    /// Restrict to a validity stamp (tolerance-window match).
    pub fn at(mut self, datev: NativeStamp) -> Self {
        self.datev = Some(datev);
        self
    }

    /// Restrict to one level code.
    pub fn at_level(mut self, ip1: LevelCode) -> Self {
        self.ip1 = Some(ip1);
        self
    }

    /// Restrict to one grid.
    pub fn on_grid(mut self, grid_id: (u32, u32, u32)) -> Self {
        self.grid_id = Some(grid_id);
        self
    }

    /// Restrict the second discriminator.
    pub fn with_ip2(mut self, ip2: u32) -> Self {
        self.ip2 = Some(ip2);
        self
    }

    /// Restrict the third discriminator.
    pub fn with_ip3(mut self, ip3: u32) -> Self {
        self.ip3 = Some(ip3);
        self
    }

    /// Restrict the type-of-variable tag.
    pub fn with_typvar(mut self, typvar: impl Into<String>) -> Self {
        self.typvar = Some(typvar.into());
        self
    }

    /// Restrict the production label.
    pub fn with_etiket(mut self, etiket: impl Into<String>) -> Self {
        self.etiket = Some(etiket.into());
        self
    }

    /// True when `meta` satisfies every set field.
    pub fn matches(&self, meta: &RecordMetadata) -> bool {
        if let Some(nomvar) = &self.nomvar {
            if *nomvar != meta.nomvar {
                return false;
            }
        }
        if let Some(typvar) = &self.typvar {
            if *typvar != meta.typvar {
                return false;
            }
        }
        if let Some(etiket) = &self.etiket {
            if *etiket != meta.etiket {
                return false;
            }
        }
        if let Some(datev) = self.datev {
            if !meta.datev.matches(datev) {
                return false;
            }
        }
        if let Some(ip1) = self.ip1 {
            if ip1 != meta.ip1 {
                return false;
            }
        }
        if let Some(ip2) = self.ip2 {
            if ip2 != meta.ip2 {
                return false;
            }
        }
        if let Some(ip3) = self.ip3 {
            if ip3 != meta.ip3 {
                return false;
            }
        }
        if let Some(grid_id) = self.grid_id {
            if grid_id != meta.grid_id {
                return false;
            }
        }
        true
    }

    /// Predicate for the level siblings of a reference record: same
    /// metadata, any level.
    pub fn siblings_of(reference: &RecordMetadata) -> Self {
        Self {
            nomvar: Some(reference.nomvar.clone()),
            typvar: Some(reference.typvar.clone()),
            etiket: Some(reference.etiket.clone()),
            datev: Some(reference.datev),
            ip1: None,
            ip2: Some(reference.ip2),
            ip3: Some(reference.ip3),
            grid_id: Some(reference.grid_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fst_common::level::LevelKind;

    fn meta(nomvar: &str, ip1: LevelCode, datev: i64) -> RecordMetadata {
        RecordMetadata {
            nomvar: nomvar.to_string(),
            typvar: "P".to_string(),
            etiket: "TEST".to_string(),
            datev: NativeStamp(datev),
            ip1,
            ip2: 6,
            ip3: 0,
            grtyp: 'L',
            grid_id: (100, 200, 0),
            ni: 4,
            nj: 3,
        }
    }

    #[test]
    fn test_variable_predicate() {
        let code = LevelCode::encode(500.0, LevelKind::PressureHpa);
        let query = RecordQuery::variable("TT");
        assert!(query.matches(&meta("TT", code, 1000)));
        assert!(!query.matches(&meta("HU", code, 1000)));
    }

    #[test]
    fn test_datev_window() {
        let code = LevelCode::encode(500.0, LevelKind::PressureHpa);
        let query = RecordQuery::variable("TT").at(NativeStamp(1000));
        assert!(query.matches(&meta("TT", code, 1006))); // +30 s
        assert!(!query.matches(&meta("TT", code, 1007))); // +35 s
    }

    #[test]
    fn test_siblings_share_everything_but_level() {
        let low = meta("TT", LevelCode::encode(1000.0, LevelKind::PressureHpa), 1000);
        let high = meta("TT", LevelCode::encode(200.0, LevelKind::PressureHpa), 1000);
        let query = RecordQuery::siblings_of(&low);
        assert!(query.matches(&high));
        assert!(low.level_sibling_of(&high));

        let other_time = meta("TT", high.ip1, 2000);
        assert!(!query.matches(&other_time));
    }
}
