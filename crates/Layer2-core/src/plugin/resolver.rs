//! Dependency Resolver - 로드 순서 결정
//!
//! 1. 직접 실패: 없는 의존성, 더 늦은 단계에 있는 의존성
//! 2. 순환: Tarjan SCC 로 찾은 크기 2 이상의 강연결 요소 (또는 자기 루프)
//! 3. 전파: 실패한 플러그인에 (전이적으로) 의존하는 플러그인도 실패
//! 4. 나머지를 단계별(pre-init → default → post-init)로 위상 정렬.
//!    준비된 후보 중 priority 가 높은 것, 같으면 이름이 빠른 것이 먼저.
//!
//! 실패한 플러그인은 버려지지 않고 `Resolution::rejected` 로 보고됩니다.

use reactor_foundation::{LoadPhase, PluginManifest, ResolutionError};
use std::cmp::Reverse;
use std::collections::{btree_set, BTreeMap, BTreeSet, BinaryHeap, HashMap, VecDeque};

/// 해석 결과
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// 로드 순서
    pub order: Vec<PluginManifest>,

    /// 거부된 플러그인 (이름순)
    pub rejected: Vec<ResolutionError>,
}

impl Resolution {
    /// 거부된 플러그인이 없는지
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    /// 로드 순서의 이름들
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|m| m.name.as_str()).collect()
    }

    /// 해당 플러그인의 거부 사유
    pub fn rejection(&self, plugin: &str) -> Option<&ResolutionError> {
        self.rejected.iter().find(|e| e.plugin() == plugin)
    }
}

/// 매니페스트 집합의 로드 순서 계산
///
/// 입력은 이름이 유일하다고 가정합니다 (`validate_manifest_set` 이후).
/// 같은 입력이면 항상 같은 결과를 냅니다.
pub fn resolve(manifests: &[PluginManifest]) -> Resolution {
    let by_name: BTreeMap<&str, &PluginManifest> =
        manifests.iter().map(|m| (m.name.as_str(), m)).collect();

    let mut failures: BTreeMap<&str, ResolutionError> = BTreeMap::new();

    // 1. 직접 실패
    for (&name, manifest) in &by_name {
        for dep in &manifest.dependencies {
            match by_name.get(dep.as_str()) {
                None => {
                    failures.insert(
                        name,
                        ResolutionError::MissingDependency {
                            plugin: name.to_string(),
                            dependency: dep.clone(),
                        },
                    );
                    break;
                }
                Some(dependency) if dependency.phase > manifest.phase => {
                    failures.insert(
                        name,
                        ResolutionError::PhaseViolation {
                            plugin: name.to_string(),
                            plugin_phase: manifest.phase.to_string(),
                            dependency: dep.clone(),
                            dependency_phase: dependency.phase.to_string(),
                        },
                    );
                    break;
                }
                Some(_) => {}
            }
        }
    }

    // 2. 순환
    for component in strongly_connected(&by_name) {
        let self_loop = component.len() == 1
            && by_name[component[0]]
                .dependencies
                .contains(component[0]);
        if component.len() < 2 && !self_loop {
            continue;
        }

        let mut members: Vec<String> = component.iter().map(|s| s.to_string()).collect();
        members.sort();
        for &name in &component {
            failures
                .entry(name)
                .or_insert_with(|| ResolutionError::Cycle {
                    plugin: name.to_string(),
                    members: members.clone(),
                });
        }
    }

    // 3. 전파
    let mut dependents: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for (&name, manifest) in &by_name {
        for dep in &manifest.dependencies {
            if let Some((&dep_name, _)) = by_name.get_key_value(dep.as_str()) {
                dependents.entry(dep_name).or_default().insert(name);
            }
        }
    }

    let mut queue: VecDeque<&str> = failures.keys().copied().collect();
    while let Some(failed) = queue.pop_front() {
        let Some(children) = dependents.get(failed) else {
            continue;
        };
        for &child in children {
            if failures.contains_key(child) {
                continue;
            }
            failures.insert(
                child,
                ResolutionError::DependencyRejected {
                    plugin: child.to_string(),
                    dependency: failed.to_string(),
                },
            );
            queue.push_back(child);
        }
    }

    // 4. 단계별 위상 정렬
    let mut order = Vec::with_capacity(by_name.len() - failures.len().min(by_name.len()));
    for phase in LoadPhase::ALL {
        let bucket: BTreeMap<&str, &PluginManifest> = by_name
            .iter()
            .filter(|(name, m)| m.phase == phase && !failures.contains_key(*name))
            .map(|(&name, &m)| (name, m))
            .collect();

        let leftover = sort_bucket(&bucket, &mut order);

        // 순환을 이미 제거했으므로 남는 것이 없어야 함
        for name in leftover {
            failures.insert(
                name,
                ResolutionError::Cycle {
                    plugin: name.to_string(),
                    members: vec![name.to_string()],
                },
            );
        }
    }

    Resolution {
        order,
        rejected: failures.into_values().collect(),
    }
}

/// 한 단계 안의 Kahn 정렬. 배치하지 못한 이름을 반환.
fn sort_bucket<'a>(
    bucket: &BTreeMap<&'a str, &'a PluginManifest>,
    order: &mut Vec<PluginManifest>,
) -> Vec<&'a str> {
    let mut indegree: HashMap<&str, usize> = HashMap::new();
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();

    for (&name, manifest) in bucket {
        let inside = manifest
            .dependencies
            .iter()
            .filter_map(|dep| bucket.get_key_value(dep.as_str()).map(|(&d, _)| d));
        let mut count = 0;
        for dep in inside {
            children.entry(dep).or_default().push(name);
            count += 1;
        }
        indegree.insert(name, count);
    }

    let mut ready: BinaryHeap<(i32, Reverse<&str>)> = bucket
        .iter()
        .filter(|(name, _)| indegree.get(*name) == Some(&0))
        .map(|(&name, m)| (m.priority, Reverse(name)))
        .collect();

    while let Some((_, Reverse(name))) = ready.pop() {
        order.push(bucket[name].clone());
        indegree.remove(name);

        for &child in children.get(name).map(Vec::as_slice).unwrap_or_default() {
            if let Some(count) = indegree.get_mut(child) {
                *count -= 1;
                if *count == 0 {
                    ready.push((bucket[child].priority, Reverse(child)));
                }
            }
        }
    }

    let mut leftover: Vec<&str> = indegree.into_keys().collect();
    leftover.sort();
    leftover
}

// ============================================================================
// Tarjan SCC
// ============================================================================

struct Tarjan<'a> {
    graph: &'a BTreeMap<&'a str, &'a PluginManifest>,
    index: HashMap<&'a str, usize>,
    lowlink: HashMap<&'a str, usize>,
    stack: Vec<&'a str>,
    on_stack: BTreeSet<&'a str>,
    next: usize,
    components: Vec<Vec<&'a str>>,
}

impl<'a> Tarjan<'a> {
    fn open(&mut self, node: &'a str) {
        self.index.insert(node, self.next);
        self.lowlink.insert(node, self.next);
        self.next += 1;
        self.stack.push(node);
        self.on_stack.insert(node);
    }

    /// 명시적 작업 스택으로 순회 (긴 의존성 체인에서도 호출 스택이 자라지 않음)
    fn visit(&mut self, root: &'a str) {
        let graph = self.graph;
        let mut work: Vec<(&'a str, btree_set::Iter<'a, String>)> =
            vec![(root, graph[root].dependencies.iter())];
        self.open(root);

        while let Some((node, deps)) = work.last_mut() {
            let node = *node;

            if let Some(dep) = deps.next() {
                let Some((&dep, _)) = graph.get_key_value(dep.as_str()) else {
                    continue;
                };
                if !self.index.contains_key(dep) {
                    self.open(dep);
                    work.push((dep, graph[dep].dependencies.iter()));
                } else if self.on_stack.contains(dep) {
                    let low = self.lowlink[node].min(self.index[dep]);
                    self.lowlink.insert(node, low);
                }
                continue;
            }

            work.pop();
            if let Some((parent, _)) = work.last() {
                let low = self.lowlink[*parent].min(self.lowlink[node]);
                self.lowlink.insert(*parent, low);
            }

            if self.lowlink[node] == self.index[node] {
                let mut component = Vec::new();
                while let Some(member) = self.stack.pop() {
                    self.on_stack.remove(member);
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                self.components.push(component);
            }
        }
    }
}

fn strongly_connected<'a>(graph: &'a BTreeMap<&'a str, &'a PluginManifest>) -> Vec<Vec<&'a str>> {
    let mut tarjan = Tarjan {
        graph,
        index: HashMap::new(),
        lowlink: HashMap::new(),
        stack: Vec::new(),
        on_stack: BTreeSet::new(),
        next: 0,
        components: Vec::new(),
    };

    for &node in graph.keys() {
        if !tarjan.index.contains_key(node) {
            tarjan.visit(node);
        }
    }
    tarjan.components
}
