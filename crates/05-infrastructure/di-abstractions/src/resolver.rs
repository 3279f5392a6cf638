//! 依赖解析器抽象接口

use infrastructure_common::{ComponentDescriptor, DependencyResult};

/// 依赖解析器 trait
///
/// 输入描述符的顺序即发现顺序，解析器按它打破拓扑排序中的平局
pub trait DependencyResolver: Send + Sync {
    /// 计算实例化顺序
    fn resolve(&self, descriptors: &[ComponentDescriptor]) -> DependencyResult<ResolutionPlan>;
}

/// 解析结果：描述符下标组成的实例化顺序，每个组件都排在它的依赖之后
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionPlan {
    order: Vec<usize>,
}

impl ResolutionPlan {
    /// 创建解析结果
    pub fn new(order: Vec<usize>) -> Self {
        Self { order }
    }

    /// 实例化顺序
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// 组件数量
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 按实例化顺序重排与描述符一一对应的元素
    ///
    /// 顺序必须恰好覆盖每个下标一次，否则返回 `None`
    pub fn arrange<T>(&self, items: Vec<T>) -> Option<Vec<T>> {
        if self.order.len() != items.len() {
            return None;
        }
        let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
        self.order
            .iter()
            .map(|&index| slots.get_mut(index).and_then(Option::take))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrange() {
        let plan = ResolutionPlan::new(vec![2, 0, 1]);
        assert_eq!(plan.arrange(vec!["a", "b", "c"]), Some(vec!["c", "a", "b"]));
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn test_arrange_rejects_incomplete_order() {
        assert_eq!(ResolutionPlan::new(vec![1]).arrange(vec!["a", "b"]), None);
        assert_eq!(ResolutionPlan::new(vec![0, 0]).arrange(vec!["a", "b"]), None);
        assert_eq!(ResolutionPlan::new(vec![0, 2]).arrange(vec!["a", "b"]), None);
    }
}
