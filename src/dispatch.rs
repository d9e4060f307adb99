use ash::vk;
use std::os::raw::c_void;

// ── Raw function pointer types ───────────────────────────────────────────────

pub type PfnGetDeviceQueue = unsafe extern "system" fn(vk::Device, u32, u32, *mut vk::Queue);

pub type PfnCreateBuffer = unsafe extern "system" fn(
    vk::Device,
    *const vk::BufferCreateInfo,
    *const vk::AllocationCallbacks,
    *mut vk::Buffer,
) -> vk::Result;

pub type PfnGetBufferMemoryRequirements =
    unsafe extern "system" fn(vk::Device, vk::Buffer, *mut vk::MemoryRequirements);

pub type PfnGetImageMemoryRequirements =
    unsafe extern "system" fn(vk::Device, vk::Image, *mut vk::MemoryRequirements);

pub type PfnAllocateMemory = unsafe extern "system" fn(
    vk::Device,
    *const vk::MemoryAllocateInfo,
    *const vk::AllocationCallbacks,
    *mut vk::DeviceMemory,
) -> vk::Result;

pub type PfnBindBufferMemory = unsafe extern "system" fn(
    vk::Device,
    vk::Buffer,
    vk::DeviceMemory,
    vk::DeviceSize,
) -> vk::Result;

pub type PfnBindImageMemory = unsafe extern "system" fn(
    vk::Device,
    vk::Image,
    vk::DeviceMemory,
    vk::DeviceSize,
) -> vk::Result;

pub type PfnMapMemory = unsafe extern "system" fn(
    vk::Device,
    vk::DeviceMemory,
    vk::DeviceSize,
    vk::DeviceSize,
    vk::MemoryMapFlags,
    *mut *mut c_void,
) -> vk::Result;

pub type PfnUnmapMemory = unsafe extern "system" fn(vk::Device, vk::DeviceMemory);

pub type PfnFreeMemory =
    unsafe extern "system" fn(vk::Device, vk::DeviceMemory, *const vk::AllocationCallbacks);

pub type PfnDestroyBuffer =
    unsafe extern "system" fn(vk::Device, vk::Buffer, *const vk::AllocationCallbacks);

pub type PfnCreateImage = unsafe extern "system" fn(
    vk::Device,
    *const vk::ImageCreateInfo,
    *const vk::AllocationCallbacks,
    *mut vk::Image,
) -> vk::Result;

pub type PfnDestroyImage =
    unsafe extern "system" fn(vk::Device, vk::Image, *const vk::AllocationCallbacks);

pub type PfnCreateImageView = unsafe extern "system" fn(
    vk::Device,
    *const vk::ImageViewCreateInfo,
    *const vk::AllocationCallbacks,
    *mut vk::ImageView,
) -> vk::Result;

pub type PfnDestroyImageView =
    unsafe extern "system" fn(vk::Device, vk::ImageView, *const vk::AllocationCallbacks);

pub type PfnCreateSampler = unsafe extern "system" fn(
    vk::Device,
    *const vk::SamplerCreateInfo,
    *const vk::AllocationCallbacks,
    *mut vk::Sampler,
) -> vk::Result;

pub type PfnDestroySampler =
    unsafe extern "system" fn(vk::Device, vk::Sampler, *const vk::AllocationCallbacks);

pub type PfnCreateRenderPass = unsafe extern "system" fn(
    vk::Device,
    *const vk::RenderPassCreateInfo,
    *const vk::AllocationCallbacks,
    *mut vk::RenderPass,
) -> vk::Result;

pub type PfnDestroyRenderPass =
    unsafe extern "system" fn(vk::Device, vk::RenderPass, *const vk::AllocationCallbacks);

pub type PfnCreateFramebuffer = unsafe extern "system" fn(
    vk::Device,
    *const vk::FramebufferCreateInfo,
    *const vk::AllocationCallbacks,
    *mut vk::Framebuffer,
) -> vk::Result;

pub type PfnDestroyFramebuffer =
    unsafe extern "system" fn(vk::Device, vk::Framebuffer, *const vk::AllocationCallbacks);

pub type PfnCreateShaderModule = unsafe extern "system" fn(
    vk::Device,
    *const vk::ShaderModuleCreateInfo,
    *const vk::AllocationCallbacks,
    *mut vk::ShaderModule,
) -> vk::Result;

pub type PfnDestroyShaderModule =
    unsafe extern "system" fn(vk::Device, vk::ShaderModule, *const vk::AllocationCallbacks);

pub type PfnCreateDescriptorSetLayout = unsafe extern "system" fn(
    vk::Device,
    *const vk::DescriptorSetLayoutCreateInfo,
    *const vk::AllocationCallbacks,
    *mut vk::DescriptorSetLayout,
) -> vk::Result;

pub type PfnDestroyDescriptorSetLayout =
    unsafe extern "system" fn(vk::Device, vk::DescriptorSetLayout, *const vk::AllocationCallbacks);

pub type PfnCreateDescriptorPool = unsafe extern "system" fn(
    vk::Device,
    *const vk::DescriptorPoolCreateInfo,
    *const vk::AllocationCallbacks,
    *mut vk::DescriptorPool,
) -> vk::Result;

pub type PfnDestroyDescriptorPool =
    unsafe extern "system" fn(vk::Device, vk::DescriptorPool, *const vk::AllocationCallbacks);

pub type PfnAllocateDescriptorSets = unsafe extern "system" fn(
    vk::Device,
    *const vk::DescriptorSetAllocateInfo,
    *mut vk::DescriptorSet,
) -> vk::Result;

pub type PfnUpdateDescriptorSets = unsafe extern "system" fn(
    vk::Device,
    u32,
    *const vk::WriteDescriptorSet,
    u32,
    *const vk::CopyDescriptorSet,
);

pub type PfnCreatePipelineLayout = unsafe extern "system" fn(
    vk::Device,
    *const vk::PipelineLayoutCreateInfo,
    *const vk::AllocationCallbacks,
    *mut vk::PipelineLayout,
) -> vk::Result;

pub type PfnDestroyPipelineLayout =
    unsafe extern "system" fn(vk::Device, vk::PipelineLayout, *const vk::AllocationCallbacks);

pub type PfnCreateGraphicsPipelines = unsafe extern "system" fn(
    vk::Device,
    vk::PipelineCache,
    u32,
    *const vk::GraphicsPipelineCreateInfo,
    *const vk::AllocationCallbacks,
    *mut vk::Pipeline,
) -> vk::Result;

pub type PfnDestroyPipeline =
    unsafe extern "system" fn(vk::Device, vk::Pipeline, *const vk::AllocationCallbacks);

pub type PfnCreateCommandPool = unsafe extern "system" fn(
    vk::Device,
    *const vk::CommandPoolCreateInfo,
    *const vk::AllocationCallbacks,
    *mut vk::CommandPool,
) -> vk::Result;

pub type PfnDestroyCommandPool =
    unsafe extern "system" fn(vk::Device, vk::CommandPool, *const vk::AllocationCallbacks);

pub type PfnAllocateCommandBuffers = unsafe extern "system" fn(
    vk::Device,
    *const vk::CommandBufferAllocateInfo,
    *mut vk::CommandBuffer,
) -> vk::Result;

pub type PfnFreeCommandBuffers =
    unsafe extern "system" fn(vk::Device, vk::CommandPool, u32, *const vk::CommandBuffer);

pub type PfnResetCommandBuffer =
    unsafe extern "system" fn(vk::CommandBuffer, vk::CommandBufferResetFlags) -> vk::Result;

pub type PfnBeginCommandBuffer =
    unsafe extern "system" fn(vk::CommandBuffer, *const vk::CommandBufferBeginInfo) -> vk::Result;

pub type PfnEndCommandBuffer = unsafe extern "system" fn(vk::CommandBuffer) -> vk::Result;

pub type PfnCmdPipelineBarrier = unsafe extern "system" fn(
    vk::CommandBuffer,
    vk::PipelineStageFlags,
    vk::PipelineStageFlags,
    vk::DependencyFlags,
    u32,
    *const vk::MemoryBarrier,
    u32,
    *const vk::BufferMemoryBarrier,
    u32,
    *const vk::ImageMemoryBarrier,
);

pub type PfnCmdBeginRenderPass = unsafe extern "system" fn(
    vk::CommandBuffer,
    *const vk::RenderPassBeginInfo,
    vk::SubpassContents,
);

pub type PfnCmdEndRenderPass = unsafe extern "system" fn(vk::CommandBuffer);

pub type PfnCmdBindPipeline =
    unsafe extern "system" fn(vk::CommandBuffer, vk::PipelineBindPoint, vk::Pipeline);

pub type PfnCmdBindDescriptorSets = unsafe extern "system" fn(
    vk::CommandBuffer,
    vk::PipelineBindPoint,
    vk::PipelineLayout,
    u32,
    u32,
    *const vk::DescriptorSet,
    u32,
    *const u32,
);

pub type PfnCmdBindVertexBuffers = unsafe extern "system" fn(
    vk::CommandBuffer,
    u32,
    u32,
    *const vk::Buffer,
    *const vk::DeviceSize,
);

pub type PfnCmdSetViewport =
    unsafe extern "system" fn(vk::CommandBuffer, u32, u32, *const vk::Viewport);

pub type PfnCmdSetScissor =
    unsafe extern "system" fn(vk::CommandBuffer, u32, u32, *const vk::Rect2D);

pub type PfnCmdPushConstants = unsafe extern "system" fn(
    vk::CommandBuffer,
    vk::PipelineLayout,
    vk::ShaderStageFlags,
    u32,
    u32,
    *const c_void,
);

pub type PfnCmdDraw = unsafe extern "system" fn(vk::CommandBuffer, u32, u32, u32, u32);

pub type PfnCmdCopyBufferToImage = unsafe extern "system" fn(
    vk::CommandBuffer,
    vk::Buffer,
    vk::Image,
    vk::ImageLayout,
    u32,
    *const vk::BufferImageCopy,
);

pub type PfnCreateFence = unsafe extern "system" fn(
    vk::Device,
    *const vk::FenceCreateInfo,
    *const vk::AllocationCallbacks,
    *mut vk::Fence,
) -> vk::Result;

pub type PfnDestroyFence =
    unsafe extern "system" fn(vk::Device, vk::Fence, *const vk::AllocationCallbacks);

pub type PfnResetFences =
    unsafe extern "system" fn(vk::Device, u32, *const vk::Fence) -> vk::Result;

pub type PfnWaitForFences =
    unsafe extern "system" fn(vk::Device, u32, *const vk::Fence, vk::Bool32, u64) -> vk::Result;

pub type PfnCreateSemaphore = unsafe extern "system" fn(
    vk::Device,
    *const vk::SemaphoreCreateInfo,
    *const vk::AllocationCallbacks,
    *mut vk::Semaphore,
) -> vk::Result;

pub type PfnDestroySemaphore =
    unsafe extern "system" fn(vk::Device, vk::Semaphore, *const vk::AllocationCallbacks);

pub type PfnQueueSubmit =
    unsafe extern "system" fn(vk::Queue, u32, *const vk::SubmitInfo, vk::Fence) -> vk::Result;

pub type PfnDeviceWaitIdle = unsafe extern "system" fn(vk::Device) -> vk::Result;

pub type PfnGetPhysDevMemProps =
    unsafe extern "system" fn(vk::PhysicalDevice, *mut vk::PhysicalDeviceMemoryProperties);

pub type PfnGetPhysDevQueueFamilyProps =
    unsafe extern "system" fn(vk::PhysicalDevice, *mut u32, *mut vk::QueueFamilyProperties);

pub type PfnGetPhysDevProps =
    unsafe extern "system" fn(vk::PhysicalDevice, *mut vk::PhysicalDeviceProperties);

pub type PfnCreateSwapchainKHR = unsafe extern "system" fn(
    vk::Device,
    *const vk::SwapchainCreateInfoKHR,
    *const vk::AllocationCallbacks,
    *mut vk::SwapchainKHR,
) -> vk::Result;

pub type PfnDestroySwapchainKHR =
    unsafe extern "system" fn(vk::Device, vk::SwapchainKHR, *const vk::AllocationCallbacks);

pub type PfnGetSwapchainImagesKHR =
    unsafe extern "system" fn(vk::Device, vk::SwapchainKHR, *mut u32, *mut vk::Image) -> vk::Result;

pub type PfnQueuePresentKHR =
    unsafe extern "system" fn(vk::Queue, *const vk::PresentInfoKHR) -> vk::Result;

// ── Loader helper ─────────────────────────────────────────────────────────────

pub unsafe fn load_device<F: Copy>(
    gdpa: vk::PFN_vkGetDeviceProcAddr,
    device: vk::Device,
    name: &[u8],
) -> Option<F> {
    let raw: *const c_void = unsafe { std::mem::transmute(gdpa(device, name.as_ptr() as _)) };
    (!raw.is_null()).then(|| unsafe { std::mem::transmute_copy(&raw) })
}

pub unsafe fn load_instance<F: Copy>(
    gipa: vk::PFN_vkGetInstanceProcAddr,
    instance: vk::Instance,
    name: &[u8],
) -> Option<F> {
    let raw: *const c_void = unsafe { std::mem::transmute(gipa(instance, name.as_ptr() as _)) };
    (!raw.is_null()).then(|| unsafe { std::mem::transmute_copy(&raw) })
}

// ── Tables ───────────────────────────────────────────────────────────────────

pub struct DeviceTable {
    pub handle: vk::Device,
    // Core 1.0
    pub get_device_queue: PfnGetDeviceQueue,
    pub create_buffer: PfnCreateBuffer,
    pub get_buffer_memory_requirements: PfnGetBufferMemoryRequirements,
    pub get_image_memory_requirements: PfnGetImageMemoryRequirements,
    pub allocate_memory: PfnAllocateMemory,
    pub bind_buffer_memory: PfnBindBufferMemory,
    pub bind_image_memory: PfnBindImageMemory,
    pub map_memory: PfnMapMemory,
    pub unmap_memory: PfnUnmapMemory,
    pub free_memory: PfnFreeMemory,
    pub destroy_buffer: PfnDestroyBuffer,
    pub create_image: PfnCreateImage,
    pub destroy_image: PfnDestroyImage,
    pub create_image_view: PfnCreateImageView,
    pub destroy_image_view: PfnDestroyImageView,
    pub create_sampler: PfnCreateSampler,
    pub destroy_sampler: PfnDestroySampler,
    pub create_render_pass: PfnCreateRenderPass,
    pub destroy_render_pass: PfnDestroyRenderPass,
    pub create_framebuffer: PfnCreateFramebuffer,
    pub destroy_framebuffer: PfnDestroyFramebuffer,
    pub create_shader_module: PfnCreateShaderModule,
    pub destroy_shader_module: PfnDestroyShaderModule,
    pub create_descriptor_set_layout: PfnCreateDescriptorSetLayout,
    pub destroy_descriptor_set_layout: PfnDestroyDescriptorSetLayout,
    pub create_descriptor_pool: PfnCreateDescriptorPool,
    pub destroy_descriptor_pool: PfnDestroyDescriptorPool,
    pub allocate_descriptor_sets: PfnAllocateDescriptorSets,
    pub update_descriptor_sets: PfnUpdateDescriptorSets,
    pub create_pipeline_layout: PfnCreatePipelineLayout,
    pub destroy_pipeline_layout: PfnDestroyPipelineLayout,
    pub create_graphics_pipelines: PfnCreateGraphicsPipelines,
    pub destroy_pipeline: PfnDestroyPipeline,
    pub create_command_pool: PfnCreateCommandPool,
    pub destroy_command_pool: PfnDestroyCommandPool,
    pub allocate_command_buffers: PfnAllocateCommandBuffers,
    pub free_command_buffers: PfnFreeCommandBuffers,
    pub reset_command_buffer: PfnResetCommandBuffer,
    pub begin_command_buffer: PfnBeginCommandBuffer,
    pub end_command_buffer: PfnEndCommandBuffer,
    pub cmd_pipeline_barrier: PfnCmdPipelineBarrier,
    pub cmd_begin_render_pass: PfnCmdBeginRenderPass,
    pub cmd_end_render_pass: PfnCmdEndRenderPass,
    pub cmd_bind_pipeline: PfnCmdBindPipeline,
    pub cmd_bind_descriptor_sets: PfnCmdBindDescriptorSets,
    pub cmd_bind_vertex_buffers: PfnCmdBindVertexBuffers,
    pub cmd_set_viewport: PfnCmdSetViewport,
    pub cmd_set_scissor: PfnCmdSetScissor,
    pub cmd_push_constants: PfnCmdPushConstants,
    pub cmd_draw: PfnCmdDraw,
    pub cmd_copy_buffer_to_image: PfnCmdCopyBufferToImage,
    pub create_fence: PfnCreateFence,
    pub destroy_fence: PfnDestroyFence,
    pub reset_fences: PfnResetFences,
    pub wait_for_fences: PfnWaitForFences,
    pub create_semaphore: PfnCreateSemaphore,
    pub destroy_semaphore: PfnDestroySemaphore,
    pub queue_submit: PfnQueueSubmit,
    pub device_wait_idle: PfnDeviceWaitIdle,
    // Extension
    pub create_swapchain_khr: PfnCreateSwapchainKHR,
    pub destroy_swapchain_khr: PfnDestroySwapchainKHR,
    pub get_swapchain_images_khr: PfnGetSwapchainImagesKHR,
    pub queue_present_khr: PfnQueuePresentKHR,
}

macro_rules! req {
    ($opt:expr, $name:literal) => {
        $opt.expect(concat!("required Vulkan function missing: ", $name))
    };
}

impl DeviceTable {
    pub unsafe fn load(device: vk::Device, gdpa: vk::PFN_vkGetDeviceProcAddr) -> Self {
        macro_rules! ld {
            ($name:literal, $ty:ty) => {
                req!(
                    unsafe { load_device::<$ty>(gdpa, device, concat!($name, "\0").as_bytes()) },
                    $name
                )
            };
        }
        Self {
            handle: device,
            get_device_queue: ld!("vkGetDeviceQueue", PfnGetDeviceQueue),
            create_buffer: ld!("vkCreateBuffer", PfnCreateBuffer),
            get_buffer_memory_requirements: ld!(
                "vkGetBufferMemoryRequirements",
                PfnGetBufferMemoryRequirements
            ),
            get_image_memory_requirements: ld!(
                "vkGetImageMemoryRequirements",
                PfnGetImageMemoryRequirements
            ),
            allocate_memory: ld!("vkAllocateMemory", PfnAllocateMemory),
            bind_buffer_memory: ld!("vkBindBufferMemory", PfnBindBufferMemory),
            bind_image_memory: ld!("vkBindImageMemory", PfnBindImageMemory),
            map_memory: ld!("vkMapMemory", PfnMapMemory),
            unmap_memory: ld!("vkUnmapMemory", PfnUnmapMemory),
            free_memory: ld!("vkFreeMemory", PfnFreeMemory),
            destroy_buffer: ld!("vkDestroyBuffer", PfnDestroyBuffer),
            create_image: ld!("vkCreateImage", PfnCreateImage),
            destroy_image: ld!("vkDestroyImage", PfnDestroyImage),
            create_image_view: ld!("vkCreateImageView", PfnCreateImageView),
            destroy_image_view: ld!("vkDestroyImageView", PfnDestroyImageView),
            create_sampler: ld!("vkCreateSampler", PfnCreateSampler),
            destroy_sampler: ld!("vkDestroySampler", PfnDestroySampler),
            create_render_pass: ld!("vkCreateRenderPass", PfnCreateRenderPass),
            destroy_render_pass: ld!("vkDestroyRenderPass", PfnDestroyRenderPass),
            create_framebuffer: ld!("vkCreateFramebuffer", PfnCreateFramebuffer),
            destroy_framebuffer: ld!("vkDestroyFramebuffer", PfnDestroyFramebuffer),
            create_shader_module: ld!("vkCreateShaderModule", PfnCreateShaderModule),
            destroy_shader_module: ld!("vkDestroyShaderModule", PfnDestroyShaderModule),
            create_descriptor_set_layout: ld!(
                "vkCreateDescriptorSetLayout",
                PfnCreateDescriptorSetLayout
            ),
            destroy_descriptor_set_layout: ld!(
                "vkDestroyDescriptorSetLayout",
                PfnDestroyDescriptorSetLayout
            ),
            create_descriptor_pool: ld!("vkCreateDescriptorPool", PfnCreateDescriptorPool),
            destroy_descriptor_pool: ld!("vkDestroyDescriptorPool", PfnDestroyDescriptorPool),
            allocate_descriptor_sets: ld!("vkAllocateDescriptorSets", PfnAllocateDescriptorSets),
            update_descriptor_sets: ld!("vkUpdateDescriptorSets", PfnUpdateDescriptorSets),
            create_pipeline_layout: ld!("vkCreatePipelineLayout", PfnCreatePipelineLayout),
            destroy_pipeline_layout: ld!("vkDestroyPipelineLayout", PfnDestroyPipelineLayout),
            create_graphics_pipelines: ld!(
                "vkCreateGraphicsPipelines",
                PfnCreateGraphicsPipelines
            ),
            destroy_pipeline: ld!("vkDestroyPipeline", PfnDestroyPipeline),
            create_command_pool: ld!("vkCreateCommandPool", PfnCreateCommandPool),
            destroy_command_pool: ld!("vkDestroyCommandPool", PfnDestroyCommandPool),
            allocate_command_buffers: ld!("vkAllocateCommandBuffers", PfnAllocateCommandBuffers),
            free_command_buffers: ld!("vkFreeCommandBuffers", PfnFreeCommandBuffers),
            reset_command_buffer: ld!("vkResetCommandBuffer", PfnResetCommandBuffer),
            begin_command_buffer: ld!("vkBeginCommandBuffer", PfnBeginCommandBuffer),
            end_command_buffer: ld!("vkEndCommandBuffer", PfnEndCommandBuffer),
            cmd_pipeline_barrier: ld!("vkCmdPipelineBarrier", PfnCmdPipelineBarrier),
            cmd_begin_render_pass: ld!("vkCmdBeginRenderPass", PfnCmdBeginRenderPass),
            cmd_end_render_pass: ld!("vkCmdEndRenderPass", PfnCmdEndRenderPass),
            cmd_bind_pipeline: ld!("vkCmdBindPipeline", PfnCmdBindPipeline),
            cmd_bind_descriptor_sets: ld!("vkCmdBindDescriptorSets", PfnCmdBindDescriptorSets),
            cmd_bind_vertex_buffers: ld!("vkCmdBindVertexBuffers", PfnCmdBindVertexBuffers),
            cmd_set_viewport: ld!("vkCmdSetViewport", PfnCmdSetViewport),
            cmd_set_scissor: ld!("vkCmdSetScissor", PfnCmdSetScissor),
            cmd_push_constants: ld!("vkCmdPushConstants", PfnCmdPushConstants),
            cmd_draw: ld!("vkCmdDraw", PfnCmdDraw),
            cmd_copy_buffer_to_image: ld!("vkCmdCopyBufferToImage", PfnCmdCopyBufferToImage),
            create_fence: ld!("vkCreateFence", PfnCreateFence),
            destroy_fence: ld!("vkDestroyFence", PfnDestroyFence),
            reset_fences: ld!("vkResetFences", PfnResetFences),
            wait_for_fences: ld!("vkWaitForFences", PfnWaitForFences),
            create_semaphore: ld!("vkCreateSemaphore", PfnCreateSemaphore),
            destroy_semaphore: ld!("vkDestroySemaphore", PfnDestroySemaphore),
            queue_submit: ld!("vkQueueSubmit", PfnQueueSubmit),
            device_wait_idle: ld!("vkDeviceWaitIdle", PfnDeviceWaitIdle),
            create_swapchain_khr: ld!("vkCreateSwapchainKHR", PfnCreateSwapchainKHR),
            destroy_swapchain_khr: ld!("vkDestroySwapchainKHR", PfnDestroySwapchainKHR),
            get_swapchain_images_khr: ld!("vkGetSwapchainImagesKHR", PfnGetSwapchainImagesKHR),
            queue_present_khr: ld!("vkQueuePresentKHR", PfnQueuePresentKHR),
        }
    }
}

pub struct InstanceTable {
    pub get_phys_dev_memory_props: PfnGetPhysDevMemProps,
    pub get_phys_dev_queue_family_props: PfnGetPhysDevQueueFamilyProps,
    pub get_phys_dev_props: PfnGetPhysDevProps,
}

impl InstanceTable {
    pub unsafe fn load(instance: vk::Instance, gipa: vk::PFN_vkGetInstanceProcAddr) -> Self {
        macro_rules! li {
            ($name:literal, $ty:ty) => {
                req!(
                    unsafe {
                        load_instance::<$ty>(gipa, instance, concat!($name, "\0").as_bytes())
                    },
                    $name
                )
            };
        }
        Self {
            get_phys_dev_memory_props: li!(
                "vkGetPhysicalDeviceMemoryProperties",
                PfnGetPhysDevMemProps
            ),
            get_phys_dev_queue_family_props: li!(
                "vkGetPhysicalDeviceQueueFamilyProperties",
                PfnGetPhysDevQueueFamilyProps
            ),
            get_phys_dev_props: li!("vkGetPhysicalDeviceProperties", PfnGetPhysDevProps),
        }
    }

    pub unsafe fn get_physical_device_memory_properties(
        &self,
        phys: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties::default();
        unsafe { (self.get_phys_dev_memory_props)(phys, &mut props) };
        props
    }

    pub unsafe fn queue_family_properties(
        &self,
        phys: vk::PhysicalDevice,
    ) -> Vec<vk::QueueFamilyProperties> {
        let mut count = 0u32;
        unsafe { (self.get_phys_dev_queue_family_props)(phys, &mut count, std::ptr::null_mut()) };
        let mut props = vec![vk::QueueFamilyProperties::default(); count as usize];
        unsafe { (self.get_phys_dev_queue_family_props)(phys, &mut count, props.as_mut_ptr()) };
        props
    }

    pub unsafe fn get_physical_device_properties(
        &self,
        phys: vk::PhysicalDevice,
    ) -> vk::PhysicalDeviceProperties {
        let mut props = vk::PhysicalDeviceProperties::default();
        unsafe { (self.get_phys_dev_props)(phys, &mut props) };
        props
    }
}
