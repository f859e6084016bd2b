// Layout pipeline: block model, builder, order/visibility resolver, pagination engine.
// One regeneration runs build_blocks -> resolve -> paginate -> markup. The whole
// pass is CPU-bound and must run inside tokio::task::spawn_blocking.

pub mod block;
pub mod builder;
pub mod handlers;
pub mod markup;
pub mod page_fill;
pub mod paginate;
pub mod resolver;

// Re-export the public API consumed by other modules (bridge, handlers).
pub use block::{Block, BlockKind};
pub use builder::{build_blocks, BuildContext, HeightModel};
pub use paginate::{paginate, Page, PageCapacity, PaginationPolicy, PaginationResult};
pub use resolver::{resolve, LayoutPreferences};
