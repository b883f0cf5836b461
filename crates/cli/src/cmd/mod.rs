mod export;
mod import;
mod list;

pub use export::cmd_export;
pub use import::cmd_import;
pub use list::cmd_list;
