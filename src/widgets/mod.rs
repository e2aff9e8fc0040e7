pub mod backups;
pub mod chrome;
pub mod editor;
pub mod form;
pub mod menu;
pub mod status_bar;
