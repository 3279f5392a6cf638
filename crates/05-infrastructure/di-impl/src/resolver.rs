//! 拓扑排序依赖解析器

use di_abstractions::{DependencyResolver, ResolutionPlan};
use infrastructure_common::{
    ComponentDescriptor, ComponentKey, DependencyError, DependencyRef, DependencyResult,
};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// 拓扑排序解析器（Kahn 算法）
///
/// 就绪集合按发现顺序取最小下标，相同输入总是得到相同的实例化顺序
#[derive(Debug, Clone, Copy, Default)]
pub struct TopologicalResolver;

impl TopologicalResolver {
    /// 创建解析器
    pub fn new() -> Self {
        Self
    }

    /// 找到每个描述符依赖的提供者下标
    fn build_edges(descriptors: &[ComponentDescriptor]) -> DependencyResult<Vec<Vec<usize>>> {
        let mut index: HashMap<ComponentKey, usize> = HashMap::with_capacity(descriptors.len());
        for (position, descriptor) in descriptors.iter().enumerate() {
            let key = descriptor.key();
            if index.insert(key.clone(), position).is_some() {
                return Err(DependencyError::DuplicateComponent {
                    key: key.to_string(),
                });
            }
        }

        let mut edges = Vec::with_capacity(descriptors.len());
        for (position, descriptor) in descriptors.iter().enumerate() {
            let mut providers: Vec<usize> = Vec::with_capacity(descriptor.dependencies.len());
            for dependency in &descriptor.dependencies {
                if dependency.kind.is_web() && !descriptor.kind.is_web() {
                    return Err(DependencyError::InvalidDependencyDirection {
                        requester: descriptor.key().to_string(),
                        dependency: dependency.to_string(),
                    });
                }

                let provider = Self::find_provider(descriptors, &index, descriptor, dependency)?;
                if provider == position {
                    return Err(DependencyError::CyclicDependency {
                        members: vec![descriptor.key().to_string(), descriptor.key().to_string()],
                    });
                }
                if !providers.contains(&provider) {
                    providers.push(provider);
                }
            }
            edges.push(providers);
        }

        Ok(edges)
    }

    fn find_provider(
        descriptors: &[ComponentDescriptor],
        index: &HashMap<ComponentKey, usize>,
        requester: &ComponentDescriptor,
        dependency: &DependencyRef,
    ) -> DependencyResult<usize> {
        let unresolved = || DependencyError::UnresolvedDependency {
            requester: requester.key().to_string(),
            missing: dependency.to_string(),
        };

        match &dependency.name {
            Some(name) => index
                .get(&ComponentKey::new(dependency.kind, name.as_str()))
                .copied()
                .ok_or_else(unresolved),
            None => {
                let candidates: Vec<usize> = descriptors
                    .iter()
                    .enumerate()
                    .filter(|(_, candidate)| candidate.kind == dependency.kind)
                    .map(|(position, _)| position)
                    .collect();
                match candidates.as_slice() {
                    [] => Err(unresolved()),
                    [single] => Ok(*single),
                    many => Err(DependencyError::AmbiguousComponent {
                        kind: dependency.kind.to_string(),
                        candidates: many
                            .iter()
                            .map(|&position| descriptors[position].registered_name().to_string())
                            .collect(),
                    }),
                }
            }
        }
    }

    /// 在未能排序的节点中找出一个环
    fn find_cycle(
        descriptors: &[ComponentDescriptor],
        edges: &[Vec<usize>],
        remaining: &[bool],
    ) -> Vec<String> {
        let Some(start) = remaining.iter().position(|&left| left) else {
            return Vec::new();
        };

        // 剩余节点至少有一个依赖也在剩余集合中，沿依赖走下去必然回到走过的节点
        let mut path = vec![start];
        let mut seen: HashMap<usize, usize> = HashMap::from([(start, 0)]);
        let mut current = start;
        loop {
            let Some(&next) = edges[current].iter().find(|&&provider| remaining[provider]) else {
                return path
                    .iter()
                    .map(|&position| descriptors[position].key().to_string())
                    .collect();
            };
            if let Some(&first) = seen.get(&next) {
                let mut members: Vec<String> = path[first..]
                    .iter()
                    .map(|&position| descriptors[position].key().to_string())
                    .collect();
                members.push(descriptors[next].key().to_string());
                return members;
            }
            seen.insert(next, path.len());
            path.push(next);
            current = next;
        }
    }
}

impl DependencyResolver for TopologicalResolver {
    fn resolve(&self, descriptors: &[ComponentDescriptor]) -> DependencyResult<ResolutionPlan> {
        let edges = Self::build_edges(descriptors)?;

        let mut pending: Vec<usize> = edges.iter().map(Vec::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); descriptors.len()];
        for (position, providers) in edges.iter().enumerate() {
            for &provider in providers {
                dependents[provider].push(position);
            }
        }

        let mut ready: BTreeSet<usize> = pending
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count == 0)
            .map(|(position, _)| position)
            .collect();
        let mut order = Vec::with_capacity(descriptors.len());

        while let Some(position) = ready.pop_first() {
            order.push(position);
            for &dependent in &dependents[position] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() < descriptors.len() {
            let remaining: Vec<bool> = pending.iter().map(|&count| count > 0).collect();
            return Err(DependencyError::CyclicDependency {
                members: Self::find_cycle(descriptors, &edges, &remaining),
            });
        }

        debug!(
            order = ?order
                .iter()
                .map(|&position| descriptors[position].key().to_string())
                .collect::<Vec<_>>(),
            "依赖解析完成"
        );
        Ok(ResolutionPlan::new(order))
    }
}
