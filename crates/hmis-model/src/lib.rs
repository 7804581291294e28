pub mod destination;
pub mod error;
pub mod lookup;
pub mod metadata;
pub mod options;
pub mod table;

pub use destination::{CURRENT_STANDARD, DestinationMap, DestinationMapping};
pub use error::{ConfigError, Result};
pub use lookup::{disability_type_name, project_type_name};
pub use metadata::{
    CleaningSpec, ClientMetadata, CollectionStage, DisabilitiesMetadata, EnrollmentMetadata,
    EntryExitMetadata, ExitMetadata, IncomeMetadata, MetadataDocument, ProjectMetadata,
    StageSpec, TableMetadata, require,
};
pub use options::MergeOptions;
pub use table::TableKind;
