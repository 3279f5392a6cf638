//! 基于注册清单的组件扫描器

use di_abstractions::{ComponentManifest, ComponentRegistration, ComponentScanner};
use infrastructure_common::{ComponentResult, DescriptorOrigin};
use tracing::{debug, info, warn};

/// 清单扫描器
///
/// 只返回命名空间落在扫描根之下的清单中的组件，顺序为清单加入顺序和清单内定义顺序
#[derive(Debug, Clone, Default)]
pub struct ManifestScanner {
    manifests: Vec<ComponentManifest>,
}

impl ManifestScanner {
    /// 创建空的扫描器
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入一个清单
    pub fn with_manifest(mut self, manifest: ComponentManifest) -> Self {
        self.manifests.push(manifest);
        self
    }

    /// 加入一个清单
    pub fn add_manifest(&mut self, manifest: ComponentManifest) {
        self.manifests.push(manifest);
    }

    /// 已加入的清单
    pub fn manifests(&self) -> &[ComponentManifest] {
        &self.manifests
    }
}

impl ComponentScanner for ManifestScanner {
    fn name(&self) -> &str {
        "manifest"
    }

    fn scan(&self, namespaces: &[String]) -> ComponentResult<Vec<ComponentRegistration>> {
        let mut registrations = Vec::new();

        for manifest in &self.manifests {
            if !namespaces.iter().any(|root| manifest.is_within(root)) {
                continue;
            }

            for action in manifest.actions() {
                if !action.kind().is_scannable() {
                    warn!(
                        namespace = manifest.namespace(),
                        component = action.type_info().short_name(),
                        kind = %action.kind(),
                        "该能力类别不参与扫描，已跳过"
                    );
                    continue;
                }

                let registration = action.to_registration(DescriptorOrigin::Scanned {
                    namespace: manifest.namespace().to_string(),
                })?;
                debug!(
                    component = %registration.descriptor.key(),
                    namespace = manifest.namespace(),
                    "发现组件"
                );
                registrations.push(registration);
            }
        }

        info!(
            count = registrations.len(),
            namespaces = ?namespaces,
            "组件扫描完成"
        );
        Ok(registrations)
    }
}
