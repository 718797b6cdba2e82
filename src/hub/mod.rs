mod cache;
mod checksum;
mod download;
mod extract;
mod label_map;
mod model;
mod pipeline_config;
mod progress;
mod registry;

pub use cache::{
    populate, CacheState, Population, LABEL_MAP_FILE, PIPELINE_CONFIG_FILE, SAVED_MODEL_DIR,
};
pub use checksum::{checksums_match, compute_sha256, compute_sha256_with_progress};
pub use download::download_to_file;
pub use extract::{extract_archive, ArchiveFormat};
pub use label_map::{load_label_map, parse_label_map, Label, LabelMap};
pub use model::{HubModel, ModelType};
pub use pipeline_config::{dims_from_config, parse_dimensions, InputDimensions};
pub use progress::{ProgressReporter, SilentProgress, Stage, TerminalProgress};
pub use registry::{RegistryClient, ResolvedSource};
