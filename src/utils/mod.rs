pub mod byte_size;
pub mod color;
pub mod curl_parser;
pub mod paths;
