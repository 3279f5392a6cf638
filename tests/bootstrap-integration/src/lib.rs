//! 应用引导端到端测试工程，测试位于 `tests/` 目录
