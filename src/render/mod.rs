//! Vulkan rendering of the overlay on top of swapchain images.
//!
//! All device work goes through the hand-loaded [`DeviceTable`]; the backend
//! never owns the swapchain, it only draws into whichever image the
//! application is about to present. Vertex data arrives pre-transformed in
//! clip space, so the pipeline is a single textured-quad pass with alpha
//! blending over the application's output.

mod shaders;

use std::sync::Arc;

use ash::vk;
use ash::vk::Handle;

use crate::dispatch::DeviceTable;
use crate::error::{OverlayError, Result};
use crate::overlay::font;
use crate::overlay::{GlyphVertex, MAX_GLYPHS, VERTICES_PER_GLYPH};

const VERTEX_BUFFER_SIZE: vk::DeviceSize =
    (MAX_GLYPHS * VERTICES_PER_GLYPH * std::mem::size_of::<GlyphVertex>()) as vk::DeviceSize;

/// What the present hook needs from a renderer. One backend instance per
/// swapchain; `record_and_submit` splices into the present wait chain by
/// waiting on the caller's semaphores and returning the one it signals.
pub trait RenderBackend: Send {
    fn create_swapchain_resources(
        &mut self,
        images: &[vk::Image],
        format: vk::Format,
        extent: vk::Extent2D,
    ) -> Result<()>;

    fn destroy_swapchain_resources(&mut self);

    fn record_and_submit(
        &mut self,
        queue: vk::Queue,
        image_index: u32,
        vertices: &[GlyphVertex],
        tint: [f32; 4],
        wait_semaphores: &[vk::Semaphore],
    ) -> Result<vk::Semaphore>;
}

struct SwapchainResources {
    extent: vk::Extent2D,
    render_pass: vk::RenderPass,
    pipeline: vk::Pipeline,
    views: Vec<vk::ImageView>,
    framebuffers: Vec<vk::Framebuffer>,
    command_buffers: Vec<vk::CommandBuffer>,
}

pub struct VkRenderBackend {
    dt: Arc<DeviceTable>,
    command_pool: vk::CommandPool,
    vertex_buf: vk::Buffer,
    vertex_mem: vk::DeviceMemory,
    vertex_ptr: *mut GlyphVertex,
    atlas_image: vk::Image,
    atlas_memory: vk::DeviceMemory,
    atlas_view: vk::ImageView,
    sampler: vk::Sampler,
    set_layout: vk::DescriptorSetLayout,
    descriptor_pool: vk::DescriptorPool,
    descriptor_set: vk::DescriptorSet,
    pipeline_layout: vk::PipelineLayout,
    vert_module: vk::ShaderModule,
    frag_module: vk::ShaderModule,
    complete: vk::Semaphore,
    in_flight: vk::Fence,
    swapchain: Option<SwapchainResources>,
}

// Raw mapped pointer; the backend itself is only ever driven from behind the
// swapchain record's lock.
unsafe impl Send for VkRenderBackend {}

impl VkRenderBackend {
    pub fn new(
        dt: Arc<DeviceTable>,
        mem_props: vk::PhysicalDeviceMemoryProperties,
        queue_family: u32,
        upload_queue: vk::Queue,
    ) -> Result<Self> {
        let dev = dt.handle;

        let command_pool = unsafe {
            let info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let mut pool = vk::CommandPool::null();
            (dt.create_command_pool)(dev, &info, std::ptr::null(), &mut pool)
                .result()
                .map_err(OverlayError::Vk)?;
            pool
        };

        let (vertex_buf, vertex_mem, vertex_ptr) = unsafe {
            let info = vk::BufferCreateInfo::default()
                .size(VERTEX_BUFFER_SIZE)
                .usage(vk::BufferUsageFlags::VERTEX_BUFFER)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);
            let mut buf = vk::Buffer::null();
            (dt.create_buffer)(dev, &info, std::ptr::null(), &mut buf)
                .result()
                .map_err(OverlayError::Vk)?;

            let mut reqs = vk::MemoryRequirements::default();
            (dt.get_buffer_memory_requirements)(dev, buf, &mut reqs);
            let mem_type = find_memory_type(
                &mem_props,
                reqs.memory_type_bits,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            )?;
            let alloc = vk::MemoryAllocateInfo::default()
                .allocation_size(reqs.size)
                .memory_type_index(mem_type);
            let mut mem = vk::DeviceMemory::null();
            (dt.allocate_memory)(dev, &alloc, std::ptr::null(), &mut mem)
                .result()
                .map_err(OverlayError::Vk)?;
            (dt.bind_buffer_memory)(dev, buf, mem, 0)
                .result()
                .map_err(OverlayError::Vk)?;

            let mut ptr: *mut std::os::raw::c_void = std::ptr::null_mut();
            (dt.map_memory)(dev, mem, 0, VERTEX_BUFFER_SIZE, vk::MemoryMapFlags::empty(), &mut ptr)
                .result()
                .map_err(OverlayError::Vk)?;
            (buf, mem, ptr as *mut GlyphVertex)
        };

        let (atlas_image, atlas_memory) = unsafe {
            let info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(vk::Format::R8_UNORM)
                .extent(vk::Extent3D {
                    width: font::ATLAS_WIDTH,
                    height: font::ATLAS_HEIGHT,
                    depth: 1,
                })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);
            let mut image = vk::Image::null();
            (dt.create_image)(dev, &info, std::ptr::null(), &mut image)
                .result()
                .map_err(OverlayError::Vk)?;

            let mut reqs = vk::MemoryRequirements::default();
            (dt.get_image_memory_requirements)(dev, image, &mut reqs);
            let mem_type = find_memory_type(
                &mem_props,
                reqs.memory_type_bits,
                vk::MemoryPropertyFlags::DEVICE_LOCAL,
            )?;
            let alloc = vk::MemoryAllocateInfo::default()
                .allocation_size(reqs.size)
                .memory_type_index(mem_type);
            let mut mem = vk::DeviceMemory::null();
            (dt.allocate_memory)(dev, &alloc, std::ptr::null(), &mut mem)
                .result()
                .map_err(OverlayError::Vk)?;
            (dt.bind_image_memory)(dev, image, mem, 0)
                .result()
                .map_err(OverlayError::Vk)?;
            (image, mem)
        };

        let atlas_view = unsafe {
            let info = vk::ImageViewCreateInfo::default()
                .image(atlas_image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(vk::Format::R8_UNORM)
                .subresource_range(color_subresource_range());
            let mut view = vk::ImageView::null();
            (dt.create_image_view)(dev, &info, std::ptr::null(), &mut view)
                .result()
                .map_err(OverlayError::Vk)?;
            view
        };

        let sampler = unsafe {
            let info = vk::SamplerCreateInfo::default()
                .mag_filter(vk::Filter::LINEAR)
                .min_filter(vk::Filter::LINEAR)
                .mipmap_mode(vk::SamplerMipmapMode::NEAREST)
                .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
                .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
                .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE);
            let mut sampler = vk::Sampler::null();
            (dt.create_sampler)(dev, &info, std::ptr::null(), &mut sampler)
                .result()
                .map_err(OverlayError::Vk)?;
            sampler
        };

        let backend_half = BackendInit {
            dt: &dt,
            mem_props: &mem_props,
            command_pool,
        };
        backend_half.upload_atlas(upload_queue, atlas_image)?;

        let set_layout = unsafe {
            let binding = vk::DescriptorSetLayoutBinding::default()
                .binding(0)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT);
            let info = vk::DescriptorSetLayoutCreateInfo::default()
                .bindings(std::slice::from_ref(&binding));
            let mut layout = vk::DescriptorSetLayout::null();
            (dt.create_descriptor_set_layout)(dev, &info, std::ptr::null(), &mut layout)
                .result()
                .map_err(OverlayError::Vk)?;
            layout
        };

        let descriptor_pool = unsafe {
            let size = vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1);
            let info = vk::DescriptorPoolCreateInfo::default()
                .max_sets(1)
                .pool_sizes(std::slice::from_ref(&size));
            let mut pool = vk::DescriptorPool::null();
            (dt.create_descriptor_pool)(dev, &info, std::ptr::null(), &mut pool)
                .result()
                .map_err(OverlayError::Vk)?;
            pool
        };

        let descriptor_set = unsafe {
            let info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(descriptor_pool)
                .set_layouts(std::slice::from_ref(&set_layout));
            let mut set = vk::DescriptorSet::null();
            (dt.allocate_descriptor_sets)(dev, &info, &mut set)
                .result()
                .map_err(OverlayError::Vk)?;

            let image_info = vk::DescriptorImageInfo::default()
                .sampler(sampler)
                .image_view(atlas_view)
                .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
            let write = vk::WriteDescriptorSet::default()
                .dst_set(set)
                .dst_binding(0)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .image_info(std::slice::from_ref(&image_info));
            (dt.update_descriptor_sets)(dev, 1, &write, 0, std::ptr::null());
            set
        };

        let pipeline_layout = unsafe {
            let push = vk::PushConstantRange::default()
                .stage_flags(vk::ShaderStageFlags::FRAGMENT)
                .offset(0)
                .size(std::mem::size_of::<[f32; 4]>() as u32);
            let info = vk::PipelineLayoutCreateInfo::default()
                .set_layouts(std::slice::from_ref(&set_layout))
                .push_constant_ranges(std::slice::from_ref(&push));
            let mut layout = vk::PipelineLayout::null();
            (dt.create_pipeline_layout)(dev, &info, std::ptr::null(), &mut layout)
                .result()
                .map_err(OverlayError::Vk)?;
            layout
        };

        let vert_module = unsafe { create_shader_module(&dt, shaders::OVERLAY_VERT)? };
        let frag_module = unsafe { create_shader_module(&dt, shaders::OVERLAY_FRAG)? };

        let complete = unsafe {
            let mut s = vk::Semaphore::null();
            (dt.create_semaphore)(dev, &vk::SemaphoreCreateInfo::default(), std::ptr::null(), &mut s)
                .result()
                .map_err(OverlayError::Vk)?;
            s
        };

        // Signaled so the first record_and_submit does not stall.
        let in_flight = unsafe {
            let info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
            let mut f = vk::Fence::null();
            (dt.create_fence)(dev, &info, std::ptr::null(), &mut f)
                .result()
                .map_err(OverlayError::Vk)?;
            f
        };

        Ok(Self {
            dt,
            command_pool,
            vertex_buf,
            vertex_mem,
            vertex_ptr,
            atlas_image,
            atlas_memory,
            atlas_view,
            sampler,
            set_layout,
            descriptor_pool,
            descriptor_set,
            pipeline_layout,
            vert_module,
            frag_module,
            complete,
            in_flight,
            swapchain: None,
        })
    }

    unsafe fn create_pipeline(
        &self,
        render_pass: vk::RenderPass,
    ) -> Result<vk::Pipeline> {
        let dt = &*self.dt;
        let entry = c"main";

        let stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(self.vert_module)
                .name(entry),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(self.frag_module)
                .name(entry),
        ];

        let binding = vk::VertexInputBindingDescription::default()
            .binding(0)
            .stride(std::mem::size_of::<GlyphVertex>() as u32)
            .input_rate(vk::VertexInputRate::VERTEX);
        let attrs = [
            vk::VertexInputAttributeDescription::default()
                .location(0)
                .binding(0)
                .format(vk::Format::R32G32_SFLOAT)
                .offset(0),
            vk::VertexInputAttributeDescription::default()
                .location(1)
                .binding(0)
                .format(vk::Format::R32G32_SFLOAT)
                .offset(8),
            vk::VertexInputAttributeDescription::default()
                .location(2)
                .binding(0)
                .format(vk::Format::R32G32B32_SFLOAT)
                .offset(16),
        ];
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(std::slice::from_ref(&binding))
            .vertex_attribute_descriptions(&attrs);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_STRIP);

        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(vk::CullModeFlags::NONE)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .line_width(1.0);

        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let blend_attachment = vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .alpha_blend_op(vk::BlendOp::ADD)
            .color_write_mask(vk::ColorComponentFlags::RGBA);
        let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
            .attachments(std::slice::from_ref(&blend_attachment));

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic = vk::PipelineDynamicStateCreateInfo::default()
            .dynamic_states(&dynamic_states);

        let info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic)
            .layout(self.pipeline_layout)
            .render_pass(render_pass)
            .subpass(0);

        let mut pipeline = vk::Pipeline::null();
        unsafe {
            (dt.create_graphics_pipelines)(
                dt.handle,
                vk::PipelineCache::null(),
                1,
                &info,
                std::ptr::null(),
                &mut pipeline,
            )
            .result()
            .map_err(OverlayError::Vk)?;
        }
        Ok(pipeline)
    }
}

/// Borrowed view used for the one-time atlas upload before `Self` exists.
struct BackendInit<'a> {
    dt: &'a Arc<DeviceTable>,
    mem_props: &'a vk::PhysicalDeviceMemoryProperties,
    command_pool: vk::CommandPool,
}

impl BackendInit<'_> {
    fn upload_atlas(&self, queue: vk::Queue, image: vk::Image) -> Result<()> {
        let dt = &**self.dt;
        let dev = dt.handle;
        let pixels = font::build_atlas();
        let size = pixels.len() as vk::DeviceSize;

        unsafe {
            let info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(vk::BufferUsageFlags::TRANSFER_SRC)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);
            let mut staging = vk::Buffer::null();
            (dt.create_buffer)(dev, &info, std::ptr::null(), &mut staging)
                .result()
                .map_err(OverlayError::Vk)?;

            let mut reqs = vk::MemoryRequirements::default();
            (dt.get_buffer_memory_requirements)(dev, staging, &mut reqs);
            let mem_type = find_memory_type(
                self.mem_props,
                reqs.memory_type_bits,
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            )?;
            let alloc = vk::MemoryAllocateInfo::default()
                .allocation_size(reqs.size)
                .memory_type_index(mem_type);
            let mut mem = vk::DeviceMemory::null();
            (dt.allocate_memory)(dev, &alloc, std::ptr::null(), &mut mem)
                .result()
                .map_err(OverlayError::Vk)?;
            (dt.bind_buffer_memory)(dev, staging, mem, 0)
                .result()
                .map_err(OverlayError::Vk)?;

            let mut ptr: *mut std::os::raw::c_void = std::ptr::null_mut();
            (dt.map_memory)(dev, mem, 0, size, vk::MemoryMapFlags::empty(), &mut ptr)
                .result()
                .map_err(OverlayError::Vk)?;
            std::ptr::copy_nonoverlapping(pixels.as_ptr(), ptr as *mut u8, pixels.len());
            (dt.unmap_memory)(dev, mem);

            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(self.command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let mut cmd = vk::CommandBuffer::null();
            (dt.allocate_command_buffers)(dev, &alloc_info, &mut cmd)
                .result()
                .map_err(OverlayError::Vk)?;
            let dev_key = *(dev.as_raw() as *const usize);
            *(cmd.as_raw() as *mut usize) = dev_key;

            let begin = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            (dt.begin_command_buffer)(cmd, &begin)
                .result()
                .map_err(OverlayError::Vk)?;

            let to_transfer = vk::ImageMemoryBarrier {
                s_type: vk::StructureType::IMAGE_MEMORY_BARRIER,
                p_next: std::ptr::null(),
                src_access_mask: vk::AccessFlags::empty(),
                dst_access_mask: vk::AccessFlags::TRANSFER_WRITE,
                old_layout: vk::ImageLayout::UNDEFINED,
                new_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                image,
                subresource_range: color_subresource_range(),
                _marker: std::marker::PhantomData,
            };
            (dt.cmd_pipeline_barrier)(
                cmd,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                0,
                std::ptr::null(),
                0,
                std::ptr::null(),
                1,
                &to_transfer,
            );

            let copy = vk::BufferImageCopy {
                buffer_offset: 0,
                buffer_row_length: 0,
                buffer_image_height: 0,
                image_subresource: vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                },
                image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
                image_extent: vk::Extent3D {
                    width: font::ATLAS_WIDTH,
                    height: font::ATLAS_HEIGHT,
                    depth: 1,
                },
            };
            (dt.cmd_copy_buffer_to_image)(
                cmd,
                staging,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                1,
                &copy,
            );

            let to_sampled = vk::ImageMemoryBarrier {
                s_type: vk::StructureType::IMAGE_MEMORY_BARRIER,
                p_next: std::ptr::null(),
                src_access_mask: vk::AccessFlags::TRANSFER_WRITE,
                dst_access_mask: vk::AccessFlags::SHADER_READ,
                old_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                new_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                image,
                subresource_range: color_subresource_range(),
                _marker: std::marker::PhantomData,
            };
            (dt.cmd_pipeline_barrier)(
                cmd,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                0,
                std::ptr::null(),
                0,
                std::ptr::null(),
                1,
                &to_sampled,
            );

            (dt.end_command_buffer)(cmd)
                .result()
                .map_err(OverlayError::Vk)?;

            let mut fence = vk::Fence::null();
            (dt.create_fence)(dev, &vk::FenceCreateInfo::default(), std::ptr::null(), &mut fence)
                .result()
                .map_err(OverlayError::Vk)?;
            let submit = vk::SubmitInfo::default()
                .command_buffers(std::slice::from_ref(&cmd));
            (dt.queue_submit)(queue, 1, &submit, fence)
                .result()
                .map_err(OverlayError::Vk)?;
            let _ = (dt.wait_for_fences)(dev, 1, &fence, vk::TRUE, 1_000_000_000);

            (dt.destroy_fence)(dev, fence, std::ptr::null());
            (dt.free_command_buffers)(dev, self.command_pool, 1, &cmd);
            (dt.free_memory)(dev, mem, std::ptr::null());
            (dt.destroy_buffer)(dev, staging, std::ptr::null());
        }
        Ok(())
    }
}

impl RenderBackend for VkRenderBackend {
    fn create_swapchain_resources(
        &mut self,
        images: &[vk::Image],
        format: vk::Format,
        extent: vk::Extent2D,
    ) -> Result<()> {
        self.destroy_swapchain_resources();
        let dt = &*self.dt;
        let dev = dt.handle;

        // The pass loads the application's rendering and draws over it; the
        // attachment enters and leaves in PRESENT_SRC layout.
        let render_pass = unsafe {
            let attachment = vk::AttachmentDescription::default()
                .format(format)
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::LOAD)
                .store_op(vk::AttachmentStoreOp::STORE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::PRESENT_SRC_KHR)
                .final_layout(vk::ImageLayout::PRESENT_SRC_KHR);
            let color_ref = vk::AttachmentReference::default()
                .attachment(0)
                .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
            let subpass = vk::SubpassDescription::default()
                .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
                .color_attachments(std::slice::from_ref(&color_ref));
            let dependency = vk::SubpassDependency::default()
                .src_subpass(vk::SUBPASS_EXTERNAL)
                .dst_subpass(0)
                .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
                .src_access_mask(vk::AccessFlags::empty())
                .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
                .dst_access_mask(
                    vk::AccessFlags::COLOR_ATTACHMENT_READ
                        | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                );
            let info = vk::RenderPassCreateInfo::default()
                .attachments(std::slice::from_ref(&attachment))
                .subpasses(std::slice::from_ref(&subpass))
                .dependencies(std::slice::from_ref(&dependency));
            let mut rp = vk::RenderPass::null();
            (dt.create_render_pass)(dev, &info, std::ptr::null(), &mut rp)
                .result()
                .map_err(OverlayError::Vk)?;
            rp
        };

        let mut views = Vec::with_capacity(images.len());
        let mut framebuffers = Vec::with_capacity(images.len());
        for &image in images {
            let view = unsafe {
                let info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(format)
                    .subresource_range(color_subresource_range());
                let mut v = vk::ImageView::null();
                (dt.create_image_view)(dev, &info, std::ptr::null(), &mut v)
                    .result()
                    .map_err(OverlayError::Vk)?;
                v
            };
            views.push(view);

            let fb = unsafe {
                let info = vk::FramebufferCreateInfo::default()
                    .render_pass(render_pass)
                    .attachments(std::slice::from_ref(&view))
                    .width(extent.width)
                    .height(extent.height)
                    .layers(1);
                let mut fb = vk::Framebuffer::null();
                (dt.create_framebuffer)(dev, &info, std::ptr::null(), &mut fb)
                    .result()
                    .map_err(OverlayError::Vk)?;
                fb
            };
            framebuffers.push(fb);
        }

        let command_buffers = unsafe {
            let info = vk::CommandBufferAllocateInfo::default()
                .command_pool(self.command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(images.len() as u32);
            let mut cbs = vec![vk::CommandBuffer::null(); images.len()];
            (dt.allocate_command_buffers)(dev, &info, cbs.as_mut_ptr())
                .result()
                .map_err(OverlayError::Vk)?;
            let dev_key = *(dev.as_raw() as *const usize);
            for cb in &cbs {
                *(cb.as_raw() as *mut usize) = dev_key;
            }
            cbs
        };

        let pipeline = unsafe { self.create_pipeline(render_pass)? };

        log::info!(
            "overlay resources ready: {} images, {:?}, {}x{}",
            images.len(),
            format,
            extent.width,
            extent.height
        );

        self.swapchain = Some(SwapchainResources {
            extent,
            render_pass,
            pipeline,
            views,
            framebuffers,
            command_buffers,
        });
        Ok(())
    }

    fn destroy_swapchain_resources(&mut self) {
        let Some(res) = self.swapchain.take() else {
            return;
        };
        let dt = &*self.dt;
        let dev = dt.handle;
        unsafe {
            let _ = (dt.wait_for_fences)(dev, 1, &self.in_flight, vk::TRUE, 1_000_000_000);
            (dt.free_command_buffers)(
                dev,
                self.command_pool,
                res.command_buffers.len() as u32,
                res.command_buffers.as_ptr(),
            );
            (dt.destroy_pipeline)(dev, res.pipeline, std::ptr::null());
            for fb in res.framebuffers {
                (dt.destroy_framebuffer)(dev, fb, std::ptr::null());
            }
            for view in res.views {
                (dt.destroy_image_view)(dev, view, std::ptr::null());
            }
            (dt.destroy_render_pass)(dev, res.render_pass, std::ptr::null());
        }
    }

    fn record_and_submit(
        &mut self,
        queue: vk::Queue,
        image_index: u32,
        vertices: &[GlyphVertex],
        tint: [f32; 4],
        wait_semaphores: &[vk::Semaphore],
    ) -> Result<vk::Semaphore> {
        let dt = &*self.dt;
        let dev = dt.handle;
        let Some(res) = &self.swapchain else {
            return Err(OverlayError::Vk(vk::Result::ERROR_INITIALIZATION_FAILED));
        };

        let count = vertices
            .len()
            .min(MAX_GLYPHS * VERTICES_PER_GLYPH);
        let glyphs = count / VERTICES_PER_GLYPH;
        let cmd = res.command_buffers[image_index as usize];

        unsafe {
            (dt.wait_for_fences)(dev, 1, &self.in_flight, vk::TRUE, 1_000_000_000)
                .result()
                .map_err(OverlayError::Vk)?;
            (dt.reset_fences)(dev, 1, &self.in_flight)
                .result()
                .map_err(OverlayError::Vk)?;

            std::ptr::copy_nonoverlapping(vertices.as_ptr(), self.vertex_ptr, count);

            (dt.reset_command_buffer)(cmd, vk::CommandBufferResetFlags::empty())
                .result()
                .map_err(OverlayError::Vk)?;
            let begin = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            (dt.begin_command_buffer)(cmd, &begin)
                .result()
                .map_err(OverlayError::Vk)?;

            let pass_begin = vk::RenderPassBeginInfo::default()
                .render_pass(res.render_pass)
                .framebuffer(res.framebuffers[image_index as usize])
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent: res.extent,
                });
            (dt.cmd_begin_render_pass)(cmd, &pass_begin, vk::SubpassContents::INLINE);

            (dt.cmd_bind_pipeline)(cmd, vk::PipelineBindPoint::GRAPHICS, res.pipeline);

            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: res.extent.width as f32,
                height: res.extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            (dt.cmd_set_viewport)(cmd, 0, 1, &viewport);
            let scissor = vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: res.extent,
            };
            (dt.cmd_set_scissor)(cmd, 0, 1, &scissor);

            (dt.cmd_bind_descriptor_sets)(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline_layout,
                0,
                1,
                &self.descriptor_set,
                0,
                std::ptr::null(),
            );
            let offset: vk::DeviceSize = 0;
            (dt.cmd_bind_vertex_buffers)(cmd, 0, 1, &self.vertex_buf, &offset);
            (dt.cmd_push_constants)(
                cmd,
                self.pipeline_layout,
                vk::ShaderStageFlags::FRAGMENT,
                0,
                std::mem::size_of::<[f32; 4]>() as u32,
                tint.as_ptr() as *const std::os::raw::c_void,
            );

            // One strip per glyph; the quads are disjoint.
            for g in 0..glyphs {
                (dt.cmd_draw)(cmd, VERTICES_PER_GLYPH as u32, 1, (g * VERTICES_PER_GLYPH) as u32, 0);
            }

            (dt.cmd_end_render_pass)(cmd);
            (dt.end_command_buffer)(cmd)
                .result()
                .map_err(OverlayError::Vk)?;

            let wait_dst_stage_mask =
                vec![vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT; wait_semaphores.len()];
            let submit = vk::SubmitInfo::default()
                .wait_semaphores(wait_semaphores)
                .wait_dst_stage_mask(&wait_dst_stage_mask)
                .command_buffers(std::slice::from_ref(&cmd))
                .signal_semaphores(std::slice::from_ref(&self.complete));
            (dt.queue_submit)(queue, 1, &submit, self.in_flight)
                .result()
                .map_err(OverlayError::Vk)?;
        }

        Ok(self.complete)
    }
}

impl Drop for VkRenderBackend {
    fn drop(&mut self) {
        self.destroy_swapchain_resources();
        let dt = &*self.dt;
        let dev = dt.handle;
        unsafe {
            let _ = (dt.device_wait_idle)(dev);
            (dt.destroy_fence)(dev, self.in_flight, std::ptr::null());
            (dt.destroy_semaphore)(dev, self.complete, std::ptr::null());
            (dt.destroy_shader_module)(dev, self.vert_module, std::ptr::null());
            (dt.destroy_shader_module)(dev, self.frag_module, std::ptr::null());
            (dt.destroy_pipeline_layout)(dev, self.pipeline_layout, std::ptr::null());
            (dt.destroy_descriptor_pool)(dev, self.descriptor_pool, std::ptr::null());
            (dt.destroy_descriptor_set_layout)(dev, self.set_layout, std::ptr::null());
            (dt.destroy_sampler)(dev, self.sampler, std::ptr::null());
            (dt.destroy_command_pool)(dev, self.command_pool, std::ptr::null());
            (dt.destroy_image_view)(dev, self.atlas_view, std::ptr::null());
            (dt.destroy_image)(dev, self.atlas_image, std::ptr::null());
            (dt.free_memory)(dev, self.atlas_memory, std::ptr::null());
            (dt.unmap_memory)(dev, self.vertex_mem);
            (dt.free_memory)(dev, self.vertex_mem, std::ptr::null());
            (dt.destroy_buffer)(dev, self.vertex_buf, std::ptr::null());
        }
    }
}

unsafe fn create_shader_module(dt: &DeviceTable, words: &[u32]) -> Result<vk::ShaderModule> {
    let info = vk::ShaderModuleCreateInfo::default().code(words);
    let mut module = vk::ShaderModule::null();
    unsafe {
        (dt.create_shader_module)(dt.handle, &info, std::ptr::null(), &mut module)
            .result()
            .map_err(OverlayError::Vk)?;
    }
    Ok(module)
}

fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

fn find_memory_type(
    props: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
) -> Result<u32> {
    for i in 0..props.memory_type_count {
        if type_bits & (1 << i) != 0
            && props.memory_types[i as usize]
                .property_flags
                .contains(required)
        {
            return Ok(i);
        }
    }
    Err(OverlayError::NoMemoryType(type_bits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_words_are_well_formed_spirv() {
        for words in [shaders::OVERLAY_VERT, shaders::OVERLAY_FRAG] {
            assert_eq!(words[0], 0x0723_0203);
            // Instruction stream must consume the module exactly.
            let mut i = 5;
            while i < words.len() {
                let wc = (words[i] >> 16) as usize;
                assert!(wc > 0);
                i += wc;
            }
            assert_eq!(i, words.len());
        }
    }

    #[test]
    fn vertex_buffer_holds_the_glyph_budget() {
        assert_eq!(
            VERTEX_BUFFER_SIZE,
            (MAX_GLYPHS * VERTICES_PER_GLYPH * 28) as vk::DeviceSize
        );
    }

    #[test]
    fn memory_type_selection() {
        let mut props = vk::PhysicalDeviceMemoryProperties::default();
        props.memory_type_count = 2;
        props.memory_types[0].property_flags = vk::MemoryPropertyFlags::DEVICE_LOCAL;
        props.memory_types[1].property_flags =
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;

        let host = find_memory_type(
            &props,
            0b11,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        );
        assert_eq!(host.unwrap(), 1);

        // Type bits can exclude an otherwise matching type.
        assert!(find_memory_type(&props, 0b01, vk::MemoryPropertyFlags::HOST_VISIBLE).is_err());
    }
}
