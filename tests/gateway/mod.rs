//! Gateway session tests

mod session_tests;
