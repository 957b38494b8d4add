mod helpers;

mod test_config;
mod test_index;
mod test_package;
mod test_upload;
mod test_version;
