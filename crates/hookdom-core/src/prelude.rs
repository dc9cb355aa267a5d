pub use crate::children;
pub use crate::component::{Component, InstanceKey, memo, memo_with};
pub use crate::dom::{Dom, Event, Handler, NodeId, NodeRef};
pub use crate::effects::{Dispose, on_unmount};
pub use crate::element::{Element, ElementKind, create_element, empty, h, text};
pub use crate::error::*;
pub use crate::hooks::{
    Ref, RenderContext, SetState, Updater, use_callback, use_effect, use_layout_effect, use_memo,
    use_ref, use_state,
};
pub use crate::memory::MemoryDom;
pub use crate::props::{Key, Props, Value, shallow_equal};
pub use crate::runtime::{Runtime, RuntimeOptions};
pub use crate::scheduler::Wake;
