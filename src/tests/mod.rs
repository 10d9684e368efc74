mod extractor_tests;
mod utils;
