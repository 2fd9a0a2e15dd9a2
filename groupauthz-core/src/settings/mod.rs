pub mod group_file;
