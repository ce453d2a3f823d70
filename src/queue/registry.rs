// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::TaskType;
use crate::workers::processor::TaskProcessor;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// 注册表错误类型
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// 该任务类型已注册处理器
    #[error("A processor is already registered for task type {0}")]
    DuplicateRegistration(TaskType),
}

/// 处理器注册表
///
/// 任务类型到处理器的一对一映射，在启动阶段填充。
#[derive(Default, Clone)]
pub struct ProcessorRegistry {
    processors: HashMap<TaskType, Arc<dyn TaskProcessor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为任务类型注册处理器
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 注册成功
    /// * `Err(RegistryError::DuplicateRegistration)` - 该类型已有处理器，原绑定保持不变
    pub fn register(
        &mut self,
        task_type: TaskType,
        processor: Arc<dyn TaskProcessor>,
    ) -> Result<(), RegistryError> {
        if self.processors.contains_key(&task_type) {
            return Err(RegistryError::DuplicateRegistration(task_type));
        }
        info!(task_type = %task_type, processor = processor.name(), "Registered task processor");
        self.processors.insert(task_type, processor);
        Ok(())
    }

    /// 查找任务类型对应的处理器
    pub fn get(&self, task_type: TaskType) -> Option<Arc<dyn TaskProcessor>> {
        self.processors.get(&task_type).cloned()
    }

    pub fn contains(&self, task_type: TaskType) -> bool {
        self.processors.contains_key(&task_type)
    }

    /// 已注册的任务类型
    pub fn task_types(&self) -> Vec<TaskType> {
        TaskType::ALL
            .into_iter()
            .filter(|t| self.processors.contains_key(t))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::task::Task;
    use crate::workers::processor::TaskError;
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl TaskProcessor for Named {
        async fn process(&self, _task: &Task) -> Result<(), TaskError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            self.0
        }
    }

    #[test]
    fn test_duplicate_registration_keeps_first_binding() {
        let mut registry = ProcessorRegistry::new();
        registry
            .register(TaskType::SecScraping, Arc::new(Named("first")))
            .unwrap();

        let err = registry
            .register(TaskType::SecScraping, Arc::new(Named("second")))
            .unwrap_err();

        assert_eq!(err, RegistryError::DuplicateRegistration(TaskType::SecScraping));
        assert_eq!(registry.get(TaskType::SecScraping).unwrap().name(), "first");
    }

    #[test]
    fn test_lookup_of_unregistered_type() {
        let mut registry = ProcessorRegistry::new();
        registry
            .register(TaskType::HoldingMerge, Arc::new(Named("merge")))
            .unwrap();

        assert!(registry.get(TaskType::DataExport).is_none());
        assert!(!registry.contains(TaskType::DataAnalysis));
        assert_eq!(registry.task_types(), vec![TaskType::HoldingMerge]);
    }
}
