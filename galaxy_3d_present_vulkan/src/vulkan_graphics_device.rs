/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait

use galaxy_3d_present::galaxy3d::{Result, Error, Config};
use galaxy_3d_present::galaxy3d::device::{
    GraphicsDevice, ColorFormat, CommandBufferHandle, DepthAttachment, DepthFormat, Extent2D,
    FenceHandle, FramebufferHandle, ImageHandle, ImageViewHandle, Rect2D, RenderPassBeginDesc,
    RenderPassHandle, SemaphoreHandle, SurfaceStatus, SurfaceSupport, SwapchainDesc,
    SwapchainHandle, Viewport,
};
use galaxy_3d_present::{engine_debug, engine_info, engine_warn, engine_error};
use ash::vk;
use ash::vk::Handle;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc};
use gpu_allocator::MemoryLocation;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use rustc_hash::FxHashMap;
use std::ffi::{CStr, CString};
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::vulkan_format::{
    acquire_status, capabilities_from_vk, clear_value_to_vk, color_format_to_vk,
    color_space_to_vk, depth_format_to_vk, extent_to_vk, present_mode_from_vk,
    present_mode_to_vk, present_status, surface_format_from_vk, vk_error,
};

/// Layer name used when validation is enabled
const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Convert a Galaxy3D handle value to a Vulkan handle
fn vk_handle<H: Handle>(raw: u64) -> H {
    H::from_raw(raw)
}

/// Lock a mutex, recovering the data if a previous holder panicked
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Debug utils loader and messenger (validation layers)
struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

/// Queue family indices chosen for a physical device
#[derive(Debug, Clone, Copy)]
struct QueueFamilies {
    graphics: u32,
    present: u32,
}

/// Vulkan graphics device bound to one window surface
///
/// Owns the instance, the surface, the logical device, the graphics and
/// present queues, the command pool and the allocator used for depth images.
/// The window passed to [`VulkanGraphicsDevice::new`] must outlive the device.
pub struct VulkanGraphicsDevice {
    /// Vulkan entry (keeps the loader alive)
    _entry: ash::Entry,
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,
    physical_device_name: String,
    device: ash::Device,

    /// Window surface and its loader
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
    swapchain_loader: ash::khr::swapchain::Device,

    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    queue_families: QueueFamilies,

    /// Serializes queue submission and presentation (queues are externally synchronized)
    queue_lock: Mutex<()>,

    /// Command pool for the per-frame command buffers (RESET_COMMAND_BUFFER)
    command_pool: Mutex<vk::CommandPool>,

    /// GPU memory allocator for depth images
    /// Wrapped in ManuallyDrop to ensure it's dropped BEFORE the device is destroyed
    allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Depth image allocations, keyed by image handle
    depth_allocations: Mutex<FxHashMap<u64, Allocation>>,

    debug_messenger: Option<DebugMessenger>,
}

impl VulkanGraphicsDevice {
    /// Create a Vulkan device presenting to `window`
    ///
    /// # Arguments
    ///
    /// * `window` - Window for surface creation
    /// * `config` - Device configuration (validation, application name)
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: Config) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| {
                    engine_error!("galaxy3d::vulkan", "Failed to load Vulkan library: {:?}", e);
                    Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
                })?;

            let validation = cfg!(feature = "vulkan-validation") && config.enable_validation;
            if config.enable_validation && !validation {
                engine_warn!("galaxy3d::vulkan",
                    "Validation requested but the vulkan-validation feature is disabled");
            }

            // Application Info
            let app_name = CString::new(config.app_name.clone())
                .map_err(|e| Error::InitializationFailed(format!("Invalid application name: {}", e)))?;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Galaxy3D")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_1);

            // Get required extensions
            let display_handle = window.display_handle()
                .map_err(|e| {
                    engine_error!("galaxy3d::vulkan", "Failed to get display handle: {}", e);
                    Error::InitializationFailed(format!("Failed to get display handle: {}", e))
                })?;
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    engine_error!("galaxy3d::vulkan", "Failed to get required extensions: {}", e);
                    Error::InitializationFailed(format!("Failed to get required extensions: {}", e))
                })?
                .to_vec();

            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            let layer_names = if validation {
                vec![VALIDATION_LAYER.as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| {
                    engine_error!("galaxy3d::vulkan", "Failed to create Vulkan instance: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
                })?;

            let debug_messenger = if validation {
                match create_debug_messenger(&entry, &instance, &config) {
                    Ok(messenger) => messenger,
                    Err(e) => {
                        instance.destroy_instance(None);
                        return Err(e);
                    }
                }
            } else {
                None
            };

            // Bind the window to the presentation engine
            let surface = match window.window_handle() {
                Ok(window_handle) => ash_window::create_surface(
                    &entry,
                    &instance,
                    display_handle.as_raw(),
                    window_handle.as_raw(),
                    None,
                )
                .map_err(|e| {
                    engine_error!("galaxy3d::vulkan", "Failed to create surface: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
                }),
                Err(e) => {
                    engine_error!("galaxy3d::vulkan", "Failed to get window handle: {}", e);
                    Err(Error::InitializationFailed(format!("Failed to get window handle: {}", e)))
                }
            };
            let surface = match surface {
                Ok(surface) => surface,
                Err(e) => {
                    destroy_debug_messenger(debug_messenger);
                    instance.destroy_instance(None);
                    return Err(e);
                }
            };

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            // Releases the surface, the messenger and the instance on failure
            let cleanup_instance = |debug_messenger: Option<DebugMessenger>| {
                surface_loader.destroy_surface(surface, None);
                destroy_debug_messenger(debug_messenger);
                instance.destroy_instance(None);
            };

            let (physical_device, queue_families, physical_device_name) =
                match pick_physical_device(&instance, &surface_loader, surface) {
                    Ok(picked) => picked,
                    Err(e) => {
                        cleanup_instance(debug_messenger);
                        return Err(e);
                    }
                };

            engine_info!("galaxy3d::vulkan", "Using GPU '{}' (graphics queue family {}, present queue family {})",
                physical_device_name, queue_families.graphics, queue_families.present);

            // Create Logical Device
            let queue_priorities = [1.0];
            let mut queue_create_infos = vec![
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(queue_families.graphics)
                    .queue_priorities(&queue_priorities),
            ];
            if queue_families.present != queue_families.graphics {
                queue_create_infos.push(
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(queue_families.present)
                        .queue_priorities(&queue_priorities),
                );
            }

            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
            let device_features = vk::PhysicalDeviceFeatures::default();

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features);

            let device = match instance.create_device(physical_device, &device_create_info, None) {
                Ok(device) => device,
                Err(e) => {
                    engine_error!("galaxy3d::vulkan", "Failed to create logical device: {:?}", e);
                    cleanup_instance(debug_messenger);
                    return Err(Error::InitializationFailed(format!("Failed to create device: {:?}", e)));
                }
            };

            let graphics_queue = device.get_device_queue(queue_families.graphics, 0);
            let present_queue = device.get_device_queue(queue_families.present, 0);

            // Command pool for per-frame command buffers (re-recorded every frame)
            let pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(queue_families.graphics)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let command_pool = match device.create_command_pool(&pool_create_info, None) {
                Ok(pool) => pool,
                Err(e) => {
                    engine_error!("galaxy3d::vulkan", "Failed to create command pool: {:?}", e);
                    device.destroy_device(None);
                    cleanup_instance(debug_messenger);
                    return Err(Error::InitializationFailed(format!("Failed to create command pool: {:?}", e)));
                }
            };

            // Create GPU allocator
            let allocator = match Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            }) {
                Ok(allocator) => allocator,
                Err(e) => {
                    engine_error!("galaxy3d::vulkan", "Failed to create GPU allocator: {:?}", e);
                    device.destroy_command_pool(command_pool, None);
                    device.destroy_device(None);
                    cleanup_instance(debug_messenger);
                    return Err(Error::InitializationFailed(format!("Failed to create allocator: {:?}", e)));
                }
            };

            let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);

            engine_debug!("galaxy3d::vulkan", "Vulkan device created (validation: {})", validation);

            Ok(Self {
                _entry: entry,
                instance,
                physical_device,
                physical_device_name,
                device,
                surface,
                surface_loader,
                swapchain_loader,
                graphics_queue,
                present_queue,
                queue_families,
                queue_lock: Mutex::new(()),
                command_pool: Mutex::new(command_pool),
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                depth_allocations: Mutex::new(FxHashMap::default()),
                debug_messenger,
            })
        }
    }

    /// Name of the selected GPU
    pub fn physical_device_name(&self) -> &str {
        &self.physical_device_name
    }

    fn create_image_view(
        &self,
        image: vk::Image,
        format: vk::Format,
        aspect_mask: vk::ImageAspectFlags,
    ) -> std::result::Result<vk::ImageView, vk::Result> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        unsafe { self.device.create_image_view(&create_info, None) }
    }

    /// Release the memory of a depth image (no-op if unknown)
    fn free_depth_allocation(&self, image: vk::Image) {
        if let Some(allocation) = lock(&self.depth_allocations).remove(&image.as_raw()) {
            if let Err(e) = lock(&self.allocator).free(allocation) {
                engine_warn!("galaxy3d::vulkan", "Failed to free depth image memory: {:?}", e);
            }
        }
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    // ===== SURFACE =====

    fn surface_support(&self) -> Result<SurfaceSupport> {
        unsafe {
            let capabilities = self.surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)
                .map_err(|e| vk_error("vkGetPhysicalDeviceSurfaceCapabilitiesKHR", e))?;
            let formats = self.surface_loader
                .get_physical_device_surface_formats(self.physical_device, self.surface)
                .map_err(|e| vk_error("vkGetPhysicalDeviceSurfaceFormatsKHR", e))?;
            let present_modes = self.surface_loader
                .get_physical_device_surface_present_modes(self.physical_device, self.surface)
                .map_err(|e| vk_error("vkGetPhysicalDeviceSurfacePresentModesKHR", e))?;

            Ok(SurfaceSupport {
                capabilities: capabilities_from_vk(&capabilities),
                formats: formats.iter().map(surface_format_from_vk).collect(),
                present_modes: present_modes.into_iter().filter_map(present_mode_from_vk).collect(),
            })
        }
    }

    fn supports_depth_attachment(&self, format: DepthFormat) -> bool {
        let properties = unsafe {
            self.instance.get_physical_device_format_properties(
                self.physical_device,
                depth_format_to_vk(format),
            )
        };
        properties.optimal_tiling_features.contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
    }

    // ===== SWAPCHAIN =====

    fn create_swapchain(&self, desc: &SwapchainDesc, old: SwapchainHandle) -> Result<SwapchainHandle> {
        unsafe {
            let capabilities = self.surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)
                .map_err(|e| vk_error("vkGetPhysicalDeviceSurfaceCapabilitiesKHR", e))?;

            let composite_alpha = [
                vk::CompositeAlphaFlagsKHR::OPAQUE,
                vk::CompositeAlphaFlagsKHR::INHERIT,
                vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
                vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
            ]
            .into_iter()
            .find(|&mode| capabilities.supported_composite_alpha.contains(mode))
            .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE);

            let queue_family_indices = [self.queue_families.graphics, self.queue_families.present];

            let mut create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(desc.image_count)
                .image_format(color_format_to_vk(desc.surface_format.format))
                .image_color_space(color_space_to_vk(desc.surface_format.color_space))
                .image_extent(extent_to_vk(desc.extent))
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(composite_alpha)
                .present_mode(present_mode_to_vk(desc.present_mode))
                .clipped(true)
                .old_swapchain(vk_handle(old.as_raw()));

            create_info = if self.queue_families.graphics != self.queue_families.present {
                create_info
                    .image_sharing_mode(vk::SharingMode::CONCURRENT)
                    .queue_family_indices(&queue_family_indices)
            } else {
                create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            };

            let swapchain = self.swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| vk_error("vkCreateSwapchainKHR", e))?;

            Ok(SwapchainHandle::from_raw(swapchain.as_raw()))
        }
    }

    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Result<Vec<ImageHandle>> {
        let images = unsafe {
            self.swapchain_loader
                .get_swapchain_images(vk_handle(swapchain.as_raw()))
                .map_err(|e| vk_error("vkGetSwapchainImagesKHR", e))?
        };
        Ok(images.into_iter().map(|image| ImageHandle::from_raw(image.as_raw())).collect())
    }

    fn destroy_swapchain(&self, swapchain: SwapchainHandle) {
        unsafe {
            self.swapchain_loader.destroy_swapchain(vk_handle(swapchain.as_raw()), None);
        }
    }

    // ===== VIEWS & ATTACHMENTS =====

    fn create_color_view(&self, image: ImageHandle, format: ColorFormat) -> Result<ImageViewHandle> {
        let view = self
            .create_image_view(vk_handle(image.as_raw()), color_format_to_vk(format), vk::ImageAspectFlags::COLOR)
            .map_err(|e| vk_error("vkCreateImageView (color)", e))?;
        Ok(ImageViewHandle::from_raw(view.as_raw()))
    }

    fn destroy_image_view(&self, view: ImageViewHandle) {
        unsafe {
            self.device.destroy_image_view(vk_handle(view.as_raw()), None);
        }
    }

    fn create_depth_attachment(&self, format: DepthFormat, extent: Extent2D) -> Result<DepthAttachment> {
        let vk_format = depth_format_to_vk(format);

        unsafe {
            let image_create_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(vk_format)
                .extent(vk::Extent3D {
                    width: extent.width,
                    height: extent.height,
                    depth: 1,
                })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = self.device.create_image(&image_create_info, None)
                .map_err(|e| vk_error("vkCreateImage (depth)", e))?;

            // Allocate memory
            let requirements = self.device.get_image_memory_requirements(image);
            let allocation = lock(&self.allocator).allocate(&AllocationCreateDesc {
                name: "depth attachment",
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!("galaxy3d::vulkan",
                        "Out of GPU memory for depth attachment ({}x{}, {:.2} MB): {:?}",
                        extent.width, extent.height, size_mb, e);
                    self.device.destroy_image(image, None);
                    return Err(Error::OutOfMemory);
                }
            };

            let bound = self.device.bind_image_memory(image, allocation.memory(), allocation.offset());
            lock(&self.depth_allocations).insert(image.as_raw(), allocation);
            if let Err(e) = bound {
                self.free_depth_allocation(image);
                self.device.destroy_image(image, None);
                return Err(vk_error("vkBindImageMemory (depth)", e));
            }

            let aspect_mask = if format.has_stencil() {
                vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
            } else {
                vk::ImageAspectFlags::DEPTH
            };
            let view = match self.create_image_view(image, vk_format, aspect_mask) {
                Ok(view) => view,
                Err(e) => {
                    self.free_depth_allocation(image);
                    self.device.destroy_image(image, None);
                    return Err(vk_error("vkCreateImageView (depth)", e));
                }
            };

            Ok(DepthAttachment {
                image: ImageHandle::from_raw(image.as_raw()),
                view: ImageViewHandle::from_raw(view.as_raw()),
            })
        }
    }

    fn destroy_depth_attachment(&self, attachment: DepthAttachment) {
        let image: vk::Image = vk_handle(attachment.image.as_raw());
        unsafe {
            self.device.destroy_image_view(vk_handle(attachment.view.as_raw()), None);
        }
        self.free_depth_allocation(image);
        unsafe {
            self.device.destroy_image(image, None);
        }
    }

    fn create_render_pass(&self, color: ColorFormat, depth: DepthFormat) -> Result<RenderPassHandle> {
        let attachments = [
            vk::AttachmentDescription::default()
                .format(color_format_to_vk(color))
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::STORE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::PRESENT_SRC_KHR),
            vk::AttachmentDescription::default()
                .format(depth_format_to_vk(depth))
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::DONT_CARE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
        ];

        let color_attachment_refs = [vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)];
        let depth_attachment_ref = vk::AttachmentReference::default()
            .attachment(1)
            .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

        let subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_attachment_refs)
            .depth_stencil_attachment(&depth_attachment_ref);

        // Image acquisition and the previous frame's depth writes must complete first
        let stage_mask = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
            | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;
        let dependency = vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(stage_mask)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(stage_mask)
            .dst_access_mask(
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            );

        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(std::slice::from_ref(&dependency));

        let render_pass = unsafe {
            self.device.create_render_pass(&render_pass_info, None)
                .map_err(|e| vk_error("vkCreateRenderPass", e))?
        };
        Ok(RenderPassHandle::from_raw(render_pass.as_raw()))
    }

    fn destroy_render_pass(&self, render_pass: RenderPassHandle) {
        unsafe {
            self.device.destroy_render_pass(vk_handle(render_pass.as_raw()), None);
        }
    }

    fn create_framebuffer(
        &self,
        render_pass: RenderPassHandle,
        attachments: &[ImageViewHandle],
        extent: Extent2D,
    ) -> Result<FramebufferHandle> {
        let views: Vec<vk::ImageView> = attachments.iter().map(|view| vk_handle(view.as_raw())).collect();

        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(vk_handle(render_pass.as_raw()))
            .attachments(&views)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe {
            self.device.create_framebuffer(&create_info, None)
                .map_err(|e| vk_error("vkCreateFramebuffer", e))?
        };
        Ok(FramebufferHandle::from_raw(framebuffer.as_raw()))
    }

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle) {
        unsafe {
            self.device.destroy_framebuffer(vk_handle(framebuffer.as_raw()), None);
        }
    }

    // ===== SYNCHRONIZATION =====

    fn create_semaphore(&self) -> Result<SemaphoreHandle> {
        let semaphore = unsafe {
            self.device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                .map_err(|e| vk_error("vkCreateSemaphore", e))?
        };
        Ok(SemaphoreHandle::from_raw(semaphore.as_raw()))
    }

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle) {
        unsafe {
            self.device.destroy_semaphore(vk_handle(semaphore.as_raw()), None);
        }
    }

    fn create_fence(&self, signaled: bool) -> Result<FenceHandle> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let fence = unsafe {
            self.device.create_fence(&vk::FenceCreateInfo::default().flags(flags), None)
                .map_err(|e| vk_error("vkCreateFence", e))?
        };
        Ok(FenceHandle::from_raw(fence.as_raw()))
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        unsafe {
            self.device.destroy_fence(vk_handle(fence.as_raw()), None);
        }
    }

    fn wait_for_fence(&self, fence: FenceHandle) -> Result<()> {
        unsafe {
            self.device
                .wait_for_fences(&[vk_handle(fence.as_raw())], true, u64::MAX)
                .map_err(|e| vk_error("vkWaitForFences", e))
        }
    }

    fn reset_fence(&self, fence: FenceHandle) -> Result<()> {
        unsafe {
            self.device
                .reset_fences(&[vk_handle(fence.as_raw())])
                .map_err(|e| vk_error("vkResetFences", e))
        }
    }

    // ===== QUEUE =====

    fn acquire_next_image(
        &self,
        swapchain: SwapchainHandle,
        signal: SemaphoreHandle,
    ) -> Result<(u32, SurfaceStatus)> {
        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                vk_handle(swapchain.as_raw()),
                u64::MAX,
                vk_handle(signal.as_raw()),
                vk::Fence::null(),
            )
        };
        acquire_status(result)
    }

    fn submit(
        &self,
        command_buffers: &[CommandBufferHandle],
        wait: SemaphoreHandle,
        signal: SemaphoreHandle,
        fence: FenceHandle,
    ) -> Result<()> {
        let buffers: Vec<vk::CommandBuffer> = command_buffers.iter().map(|cb| vk_handle(cb.as_raw())).collect();
        let wait_semaphores = [vk_handle::<vk::Semaphore>(wait.as_raw())];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [vk_handle::<vk::Semaphore>(signal.as_raw())];

        let mut submit_info = vk::SubmitInfo::default().command_buffers(&buffers);
        if !wait.is_null() {
            submit_info = submit_info
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages);
        }
        if !signal.is_null() {
            submit_info = submit_info.signal_semaphores(&signal_semaphores);
        }

        let _queue = lock(&self.queue_lock);
        unsafe {
            self.device
                .queue_submit(self.graphics_queue, &[submit_info], vk_handle(fence.as_raw()))
                .map_err(|e| vk_error("vkQueueSubmit", e))
        }
    }

    fn present(
        &self,
        swapchain: SwapchainHandle,
        image_index: u32,
        wait: SemaphoreHandle,
    ) -> Result<SurfaceStatus> {
        let swapchains = [vk_handle::<vk::SwapchainKHR>(swapchain.as_raw())];
        let image_indices = [image_index];
        let wait_semaphores = [vk_handle::<vk::Semaphore>(wait.as_raw())];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let _queue = lock(&self.queue_lock);
        let result = unsafe { self.swapchain_loader.queue_present(self.present_queue, &present_info) };
        present_status(result)
    }

    fn wait_idle(&self) -> Result<()> {
        let _queue = lock(&self.queue_lock);
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| vk_error("vkDeviceWaitIdle", e))
        }
    }

    // ===== COMMAND BUFFERS =====

    fn allocate_command_buffers(&self, count: u32) -> Result<Vec<CommandBufferHandle>> {
        let pool = lock(&self.command_pool);
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let buffers = unsafe {
            self.device.allocate_command_buffers(&allocate_info)
                .map_err(|e| vk_error("vkAllocateCommandBuffers", e))?
        };
        Ok(buffers.into_iter().map(|cb| CommandBufferHandle::from_raw(cb.as_raw())).collect())
    }

    fn free_command_buffers(&self, command_buffers: &[CommandBufferHandle]) {
        if command_buffers.is_empty() {
            return;
        }
        let buffers: Vec<vk::CommandBuffer> = command_buffers.iter().map(|cb| vk_handle(cb.as_raw())).collect();
        let pool = lock(&self.command_pool);
        unsafe {
            self.device.free_command_buffers(*pool, &buffers);
        }
    }

    fn begin_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        // The pool is shared with allocation and free
        let _pool = lock(&self.command_pool);
        unsafe {
            self.device
                .begin_command_buffer(vk_handle(command_buffer.as_raw()), &begin_info)
                .map_err(|e| vk_error("vkBeginCommandBuffer", e))
        }
    }

    fn end_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        unsafe {
            self.device
                .end_command_buffer(vk_handle(command_buffer.as_raw()))
                .map_err(|e| vk_error("vkEndCommandBuffer", e))
        }
    }

    fn cmd_begin_render_pass(&self, command_buffer: CommandBufferHandle, desc: &RenderPassBeginDesc) {
        let clear_values = desc.clear_values.map(clear_value_to_vk);
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(vk_handle(desc.render_pass.as_raw()))
            .framebuffer(vk_handle(desc.framebuffer.as_raw()))
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: extent_to_vk(desc.extent),
            })
            .clear_values(&clear_values);

        unsafe {
            self.device.cmd_begin_render_pass(
                vk_handle(command_buffer.as_raw()),
                &begin_info,
                vk::SubpassContents::INLINE,
            );
        }
    }

    fn cmd_end_render_pass(&self, command_buffer: CommandBufferHandle) {
        unsafe {
            self.device.cmd_end_render_pass(vk_handle(command_buffer.as_raw()));
        }
    }

    fn cmd_set_viewport(&self, command_buffer: CommandBufferHandle, viewport: Viewport) {
        let viewport = vk::Viewport {
            x: viewport.x,
            y: viewport.y,
            width: viewport.width,
            height: viewport.height,
            min_depth: viewport.min_depth,
            max_depth: viewport.max_depth,
        };
        unsafe {
            self.device.cmd_set_viewport(vk_handle(command_buffer.as_raw()), 0, &[viewport]);
        }
    }

    fn cmd_set_scissor(&self, command_buffer: CommandBufferHandle, scissor: Rect2D) {
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: scissor.x, y: scissor.y },
            extent: vk::Extent2D { width: scissor.width, height: scissor.height },
        };
        unsafe {
            self.device.cmd_set_scissor(vk_handle(command_buffer.as_raw()), 0, &[scissor]);
        }
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            // Wait for device to finish
            self.device.device_wait_idle().ok();

            // 1. Command pool (frees any command buffer still allocated)
            let pool = *lock(&self.command_pool);
            if pool != vk::CommandPool::null() {
                self.device.destroy_command_pool(pool, None);
            }

            // 2. Depth memory still owned (chains normally release it first)
            let leftover: Vec<(u64, Allocation)> = lock(&self.depth_allocations).drain().collect();
            if !leftover.is_empty() {
                engine_warn!("galaxy3d::vulkan", "{} depth allocation(s) still alive at device destruction", leftover.len());
            }
            for (_, allocation) in leftover {
                lock(&self.allocator).free(allocation).ok();
            }

            // 3. Drop allocator: free VkDeviceMemory pages BEFORE destroying device
            ManuallyDrop::drop(&mut self.allocator);

            // 4. Debug messenger BEFORE device and instance
            destroy_debug_messenger(self.debug_messenger.take());

            // 5. Device, surface and instance
            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);
            self.instance.destroy_instance(None);
        }
        engine_debug!("galaxy3d::vulkan", "Vulkan device destroyed");
    }
}

// ===== INITIALIZATION HELPERS =====

/// Pick the most suitable GPU for presenting to `surface`
///
/// A device qualifies when it has a graphics queue, a queue able to present
/// to the surface, the swapchain extension, and at least one surface format
/// and present mode. Discrete GPUs are preferred over integrated ones.
fn pick_physical_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<(vk::PhysicalDevice, QueueFamilies, String)> {
    let physical_devices = unsafe {
        instance.enumerate_physical_devices()
            .map_err(|e| {
                engine_error!("galaxy3d::vulkan", "Failed to enumerate physical devices: {:?}", e);
                Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
            })?
    };

    let mut best: Option<(u32, vk::PhysicalDevice, QueueFamilies, String)> = None;

    for physical_device in physical_devices {
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let name = properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "Unknown GPU".to_string());

        let Some(families) = find_queue_families(instance, surface_loader, surface, physical_device) else {
            engine_debug!("galaxy3d::vulkan", "Skipping GPU '{}': no graphics/present queue", name);
            continue;
        };
        if !supports_swapchain(instance, physical_device) {
            engine_debug!("galaxy3d::vulkan", "Skipping GPU '{}': no swapchain extension", name);
            continue;
        }
        let adequate = unsafe {
            let formats = surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .unwrap_or_default();
            let modes = surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface)
                .unwrap_or_default();
            !formats.is_empty() && !modes.is_empty()
        };
        if !adequate {
            engine_debug!("galaxy3d::vulkan", "Skipping GPU '{}': surface has no format or present mode", name);
            continue;
        }

        let score = match properties.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => 2,
            vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
            _ => 0,
        };
        if best.as_ref().map_or(true, |(best_score, ..)| score > *best_score) {
            best = Some((score, physical_device, families, name));
        }
    }

    best.map(|(_, device, families, name)| (device, families, name))
        .ok_or_else(|| {
            engine_error!("galaxy3d::vulkan", "No GPU can present to this window");
            Error::InitializationFailed("No suitable Vulkan GPU found".to_string())
        })
}

/// Graphics and present queue families, preferring a single family for both
fn find_queue_families(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
) -> Option<QueueFamilies> {
    let queue_families = unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

    let can_present = |index: u32| unsafe {
        surface_loader
            .get_physical_device_surface_support(physical_device, index, surface)
            .unwrap_or(false)
    };

    let graphics: Vec<u32> = queue_families
        .iter()
        .enumerate()
        .filter(|(_, family)| family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .map(|(index, _)| index as u32)
        .collect();

    if let Some(&both) = graphics.iter().find(|&&index| can_present(index)) {
        return Some(QueueFamilies { graphics: both, present: both });
    }

    let graphics = *graphics.first()?;
    let present = (0..queue_families.len() as u32).find(|&index| can_present(index))?;
    Some(QueueFamilies { graphics, present })
}

fn supports_swapchain(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> bool {
    let extensions = unsafe {
        instance
            .enumerate_device_extension_properties(physical_device)
            .unwrap_or_default()
    };
    extensions.iter().any(|extension| {
        extension
            .extension_name_as_c_str()
            .is_ok_and(|name| name == ash::khr::swapchain::NAME)
    })
}

#[cfg(feature = "vulkan-validation")]
fn create_debug_messenger(
    entry: &ash::Entry,
    instance: &ash::Instance,
    config: &Config,
) -> Result<Option<DebugMessenger>> {
    let loader = ash::ext::debug_utils::Instance::new(entry, instance);

    crate::debug::init_debug_config(crate::debug::Config {
        severity: config.debug_severity,
        output: config.debug_output.clone(),
        message_filter: config.debug_message_filter,
        break_on_error: config.break_on_validation_error,
        panic_on_error: config.panic_on_error,
        enable_stats: config.enable_validation_stats,
    });

    let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(crate::debug::severity_flags(config.debug_severity))
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

    let messenger = unsafe {
        loader
            .create_debug_utils_messenger(&debug_info, None)
            .map_err(|e| {
                engine_error!("galaxy3d::vulkan", "Failed to create debug messenger: {:?}", e);
                Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
            })?
    };

    Ok(Some(DebugMessenger { loader, messenger }))
}

#[cfg(not(feature = "vulkan-validation"))]
fn create_debug_messenger(
    _entry: &ash::Entry,
    _instance: &ash::Instance,
    _config: &Config,
) -> Result<Option<DebugMessenger>> {
    Ok(None)
}

fn destroy_debug_messenger(debug_messenger: Option<DebugMessenger>) {
    // Prevent callbacks during destruction
    #[cfg(feature = "vulkan-validation")]
    crate::debug::cleanup_debug_config();

    if let Some(DebugMessenger { loader, messenger }) = debug_messenger {
        unsafe {
            loader.destroy_debug_utils_messenger(messenger, None);
        }
    }
}
