//! 组合层测试

mod bootstrap_tests;
