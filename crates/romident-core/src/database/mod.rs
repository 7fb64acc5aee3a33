pub mod dat;
pub mod index;
pub mod record;

pub use dat::{dat_files_in_dir, load_dat_dir, load_dat_file, load_dat_files, parse_dat};
pub use index::{DatabaseIndex, IndexStats, NameMatch};
pub use record::{RomRecord, DEFAULT_NAME_TEMPLATE};
