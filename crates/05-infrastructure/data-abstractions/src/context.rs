//! 事务上下文

use crate::source::PhysicalTransaction;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// 延迟副作用失败的错误类型
pub type EffectError = Box<dyn std::error::Error + Send + Sync>;

/// 延迟副作用：只在最外层作用域提交成功后执行
pub type DeferredEffect = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), EffectError>> + Send>;

/// 事务上下文
///
/// 属于唯一一个逻辑工作单元，最外层作用域的深度为 0，每进入一层嵌套作用域深度加一
pub struct TransactionContext {
    depth: usize,
    deferred_effects: Vec<DeferredEffect>,
    rolled_back: bool,
    physical: Arc<dyn PhysicalTransaction>,
}

impl TransactionContext {
    /// 为刚开启的物理事务创建上下文
    pub fn new(physical: Arc<dyn PhysicalTransaction>) -> Self {
        Self {
            depth: 0,
            deferred_effects: Vec::new(),
            rolled_back: false,
            physical,
        }
    }

    /// 当前嵌套深度
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// 是否已被标记为回滚
    pub fn is_rolled_back(&self) -> bool {
        self.rolled_back
    }

    /// 共享的物理事务
    pub fn physical(&self) -> Arc<dyn PhysicalTransaction> {
        self.physical.clone()
    }

    /// 已登记的延迟副作用数量
    pub fn deferred_count(&self) -> usize {
        self.deferred_effects.len()
    }

    /// 进入嵌套作用域
    pub fn enter(&mut self) {
        self.depth += 1;
    }

    /// 退出嵌套作用域
    pub fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// 标记回滚，已登记的延迟副作用全部丢弃
    pub fn mark_rolled_back(&mut self) {
        self.rolled_back = true;
        self.deferred_effects.clear();
    }

    /// 登记延迟副作用；已回滚的上下文不再接收
    pub fn defer(&mut self, effect: DeferredEffect) {
        if !self.rolled_back {
            self.deferred_effects.push(effect);
        }
    }

    /// 取出所有延迟副作用（按登记顺序）
    pub fn take_effects(&mut self) -> Vec<DeferredEffect> {
        std::mem::take(&mut self.deferred_effects)
    }
}

impl fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionContext")
            .field("depth", &self.depth)
            .field("deferred_effects", &self.deferred_effects.len())
            .field("rolled_back", &self.rolled_back)
            .finish()
    }
}
