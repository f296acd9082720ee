//! Reserved names and protocol constants

/// Name the mapper reports in `--about` output and uses as env-var prefix.
pub const MAPPER_NAME: &str = "mapper-fivetran";

/// Prefix for configuration read from the environment.
pub const ENV_PREFIX: &str = "MAPPER_FIVETRAN_";

/// Separator joining flattened property names. Fixed for this mapper.
pub const FLATTENING_SEPARATOR: &str = "_";

/// Default maximum flattening depth.
pub const DEFAULT_FLATTENING_MAX_DEPTH: usize = 1;

/// Flattened names at or above this length get their parent segments abbreviated.
pub const MAX_FLATTENED_KEY_LEN: usize = 255;

/// Singer metadata column carrying the extraction timestamp.
pub const SDC_EXTRACTED_AT: &str = "_sdc_extracted_at";

/// Singer metadata column carrying the deletion timestamp.
pub const SDC_DELETED_AT: &str = "_sdc_deleted_at";

/// Fivetran system columns.
///
/// See <https://fivetran.com/docs/core-concepts/system-columns-and-tables#systemcolumns>.
/// A user column normalizing to one of these names is overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemColumn {
    /// Synthetic primary key, derived from record content
    Id,
    /// Time the row was synced
    Synced,
    /// Soft-delete marker
    Deleted,
}

impl SystemColumn {
    /// Every system column, in injection order.
    pub const ALL: [SystemColumn; 3] = [SystemColumn::Id, SystemColumn::Synced, SystemColumn::Deleted];

    /// Column name on the wire
    pub const fn as_str(&self) -> &'static str {
        match self {
            SystemColumn::Id => "_fivetran_id",
            SystemColumn::Synced => "_fivetran_synced",
            SystemColumn::Deleted => "_fivetran_deleted",
        }
    }

    /// Check whether `name` is this column's wire name
    pub fn matches(&self, name: &str) -> bool {
        self.as_str() == name
    }
}

impl std::fmt::Display for SystemColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for SystemColumn {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
