//! Opaque GPU object handles
//!
//! Backends store their native 64-bit handle value inside these newtypes.
//! The core never interprets the value; it only compares, copies and hands it back.

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(u64);

        impl $name {
            /// The null handle
            pub const NULL: Self = Self(0);

            /// Wrap a raw backend handle value
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Raw backend handle value
            pub const fn as_raw(self) -> u64 {
                self.0
            }

            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }
    };
}

define_handle!(
    /// Presentation swapchain
    SwapchainHandle
);
define_handle!(
    /// Image owned by a swapchain or a depth attachment
    ImageHandle
);
define_handle!(ImageViewHandle);
define_handle!(RenderPassHandle);
define_handle!(FramebufferHandle);
define_handle!(
    /// GPU-only ordering primitive
    SemaphoreHandle
);
define_handle!(
    /// CPU-observable GPU-signaled primitive
    FenceHandle
);
define_handle!(CommandBufferHandle);
define_handle!(
    /// Descriptor set bound by render systems (global uniforms)
    DescriptorSetHandle
);
