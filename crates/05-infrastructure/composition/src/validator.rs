//! 注册后校验
//!
//! 对前面阶段报告为已注册的每个组件，重新在注册表中按键查找一次。
//! 找不到说明某条注册路径声称成功却没有真正发布到注册表，属于引导内部缺陷，
//! 与用户配置错误区分开。

use crate::report::RegisteredComponent;
use di_abstractions::ComponentLookup;
use infrastructure_common::{InfrastructureError, InfrastructureResult};
use tracing::{debug, error};

/// 注册后校验器
#[derive(Debug, Clone, Copy, Default)]
pub struct PostRegistrationValidator;

impl PostRegistrationValidator {
    /// 创建校验器
    pub fn new() -> Self {
        Self
    }

    /// 校验所有已报告的组件都能从注册表查到，返回校验通过的数量
    pub fn validate(
        &self,
        lookup: &dyn ComponentLookup,
        registered: &[RegisteredComponent],
    ) -> InfrastructureResult<usize> {
        for component in registered {
            if let Err(lookup_error) = lookup.get(component.key.kind, Some(&component.key.name)) {
                error!(
                    component = %component.type_name,
                    key = %component.key,
                    phase = %component.phase,
                    error = %lookup_error,
                    "组件声称已注册，但注册表中不存在"
                );
                return Err(InfrastructureError::PostRegistrationValidation {
                    component: component.type_name.clone(),
                    key: component.key.to_string(),
                });
            }
        }

        debug!(count = registered.len(), "注册后校验通过");
        Ok(registered.len())
    }
}
