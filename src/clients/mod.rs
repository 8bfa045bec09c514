pub mod driver_directory;
