pub mod analysis;
pub mod memory;
pub mod report;

pub use analysis::AnalysisRepository;
pub use memory::MemoryStore;
pub use report::ReportRepository;

use crate::error::AppResult;

/// 记录修改函数：基于当前值生成替换值
pub type Modifier<'a, V> = &'a (dyn Fn(&V) -> AppResult<V> + Send + Sync);

/// 键值存储抽象接口
///
/// 仓库层只依赖该接口，内存实现之外可以接入任意持久化引擎。
#[async_trait::async_trait]
pub trait KeyValueStore<V>: Send + Sync + std::fmt::Debug
where
    V: Clone + Send + Sync + 'static,
{
    /// 读取记录
    async fn get(&self, key: &str) -> Option<V>;

    /// 仅在键不存在时写入，返回是否写入成功
    async fn insert_if_absent(&self, key: &str, value: V) -> bool;

    /// 原子地读取-修改-替换整条记录；键不存在时返回 None
    async fn modify(&self, key: &str, modifier: Modifier<'_, V>) -> AppResult<Option<V>>;

    /// 记录数量
    async fn len(&self) -> usize;
}
