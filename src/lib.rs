//! Implicit Vulkan layer drawing a telemetry overlay over presented frames.
//!
//! The loader hands us the dispatch chain at instance and device creation;
//! everything the layer does not hook is forwarded through the next link
//! untouched. Intercepted objects are tracked in per-kind registries keyed
//! by dispatch pointer, and the present hook paces telemetry sampling,
//! regenerates the overlay text and splices an overlay draw into the
//! present wait chain.

#![allow(dead_code)]

pub mod config;
pub mod dispatch;
mod error;
pub mod overlay;
pub mod present;
pub mod registry;
pub mod render;
pub mod telemetry;

use ash::vk;
use ash::vk::Handle;
use once_cell::sync::{Lazy, OnceCell};
use std::ffi::CStr;
use std::os::raw::{c_char, c_void};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use config::OverlayConfig;
use dispatch::{DeviceTable, InstanceTable};
use overlay::OverlayBuffer;
use present::PresentStats;
use registry::{RecordId, Registry};
use render::{RenderBackend, VkRenderBackend};
use telemetry::{CpuStats, GpuSource};

pub use error::{OverlayError, Result};

const LAYER_NAME: &[u8] = b"VK_LAYER_TELEM_overlay\0";
const LAYER_DESCRIPTION: &[u8] = b"Telemetry overlay layer\0";

// ── Registries ───────────────────────────────────────────────────────────────

static INSTANCES: Lazy<Registry<InstanceRecord>> = Lazy::new(Registry::new);
static DEVICES: Lazy<Registry<DeviceRecord>> = Lazy::new(Registry::new);
static QUEUES: Lazy<Registry<QueueRecord>> = Lazy::new(Registry::new);
static SWAPCHAINS: Lazy<Registry<SwapchainRecord>> = Lazy::new(Registry::new);

struct InstanceRecord {
    handle: vk::Instance,
    next_gipa: vk::PFN_vkGetInstanceProcAddr,
    it: Arc<InstanceTable>,
    config: OverlayConfig,
    cpu: Mutex<CpuStats>,
    /// Device extensions supported below this instance, enumerated on the
    /// first device creation.
    device_extensions: OnceCell<Vec<String>>,
}

impl InstanceRecord {
    fn device_extensions(&self, phys_device: vk::PhysicalDevice) -> &[String] {
        self.device_extensions
            .get_or_init(|| unsafe { enumerate_device_extensions(self, phys_device) })
    }

    fn extension_supported(&self, phys_device: vk::PhysicalDevice, name: &str) -> bool {
        self.device_extensions(phys_device).iter().any(|e| e == name)
    }
}

struct DeviceRecord {
    next_gdpa: vk::PFN_vkGetDeviceProcAddr,
    dt: Arc<DeviceTable>,
    instance: RecordId,
    config: OverlayConfig,
    mem_props: vk::PhysicalDeviceMemoryProperties,
    /// Picked once at creation; a device with no usable source stays `None`.
    gpu: GpuSource,
    graphics_family: Option<u32>,
    graphics_queue: vk::Queue,
}

/// Queues are registered up front from the device's queue create infos, so
/// the present hook never has to guess a family index.
struct QueueRecord {
    device: RecordId,
    device_key: usize,
    family: u32,
    flags: vk::QueueFlags,
    timestamp_valid_bits: u32,
}

struct SwapchainRecord {
    device: RecordId,
    device_key: usize,
    buffer: OverlayBuffer,
    stats: Mutex<PresentStats>,
    backend: Mutex<Box<dyn RenderBackend>>,
}

/// First machine word behind a dispatchable handle. All handles created from
/// the same instance or device share it.
unsafe fn dispatch_key(handle: u64) -> usize {
    unsafe { *(handle as *const usize) }
}

// ── Loader negotiate ─────────────────────────────────────────────────────────

#[repr(C)]
pub struct VkNegotiateLayerInterface {
    s_type: u32,
    p_next: *mut c_void,
    loader_layer_interface_version: u32,
    pfn_get_instance_proc_addr: *const c_void,
    pfn_get_device_proc_addr: *const c_void,
    pfn_get_physical_device_proc_addr: *const c_void,
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn vkNegotiateLoaderLayerInterfaceVersion(
    p: *mut VkNegotiateLayerInterface,
) -> vk::Result {
    let _ = env_logger::try_init();

    if p.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }
    unsafe {
        (*p).loader_layer_interface_version = 2;
        (*p).pfn_get_instance_proc_addr = telem_overlay_GetInstanceProcAddr as _;
        (*p).pfn_get_device_proc_addr = telem_overlay_GetDeviceProcAddr as _;
        (*p).pfn_get_physical_device_proc_addr = std::ptr::null();
    }
    vk::Result::SUCCESS
}

// ── Layer enumeration ────────────────────────────────────────────────────────

fn fill_layer_properties(props: &mut vk::LayerProperties) {
    for (i, &b) in LAYER_NAME.iter().enumerate() {
        props.layer_name[i] = b as c_char;
    }
    for (i, &b) in LAYER_DESCRIPTION.iter().enumerate() {
        props.description[i] = b as c_char;
    }
    props.spec_version = vk::API_VERSION_1_3;
    props.implementation_version = 1;
}

unsafe fn enumerate_own_layer(
    p_property_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    unsafe {
        if p_property_count.is_null() {
            return vk::Result::ERROR_INITIALIZATION_FAILED;
        }
        if p_properties.is_null() {
            *p_property_count = 1;
            return vk::Result::SUCCESS;
        }
        if *p_property_count == 0 {
            return vk::Result::INCOMPLETE;
        }
        *p_property_count = 1;
        let mut props = vk::LayerProperties::default();
        fill_layer_properties(&mut props);
        *p_properties = props;
    }
    vk::Result::SUCCESS
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn telem_overlay_EnumerateInstanceLayerProperties(
    p_property_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    unsafe { enumerate_own_layer(p_property_count, p_properties) }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn telem_overlay_EnumerateDeviceLayerProperties(
    _physical_device: vk::PhysicalDevice,
    p_property_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    unsafe { enumerate_own_layer(p_property_count, p_properties) }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn telem_overlay_EnumerateInstanceExtensionProperties(
    _p_layer_name: *const c_char,
    p_property_count: *mut u32,
    _p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    if !p_property_count.is_null() {
        unsafe {
            *p_property_count = 0;
        }
    }
    vk::Result::SUCCESS
}

type PfnEnumerateDeviceExtensionProperties = unsafe extern "system" fn(
    vk::PhysicalDevice,
    *const c_char,
    *mut u32,
    *mut vk::ExtensionProperties,
) -> vk::Result;

#[unsafe(no_mangle)]
pub unsafe extern "system" fn telem_overlay_EnumerateDeviceExtensionProperties(
    physical_device: vk::PhysicalDevice,
    p_layer_name: *const c_char,
    p_property_count: *mut u32,
    p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    // Queries naming this layer get an empty list; anything else goes down
    // the chain.
    let for_this_layer = !p_layer_name.is_null()
        && unsafe { CStr::from_ptr(p_layer_name).to_bytes_with_nul() } == LAYER_NAME;
    if for_this_layer || physical_device == vk::PhysicalDevice::null() {
        if !p_property_count.is_null() {
            unsafe {
                *p_property_count = 0;
            }
        }
        return vk::Result::SUCCESS;
    }

    let key = unsafe { dispatch_key(physical_device.as_raw()) };
    if let Some(inst) = INSTANCES.lookup(key) {
        let next: vk::PFN_vkVoidFunction = unsafe {
            (inst.next_gipa)(
                inst.handle,
                b"vkEnumerateDeviceExtensionProperties\0".as_ptr() as _,
            )
        };
        let forward: PfnEnumerateDeviceExtensionProperties = unsafe { std::mem::transmute(next) };
        return unsafe {
            forward(physical_device, p_layer_name, p_property_count, p_properties)
        };
    }
    vk::Result::ERROR_INITIALIZATION_FAILED
}

/// Two-call sweep through the next link; an error leaves the list empty.
unsafe fn enumerate_device_extensions(
    inst: &InstanceRecord,
    phys_device: vk::PhysicalDevice,
) -> Vec<String> {
    let next: vk::PFN_vkVoidFunction = unsafe {
        (inst.next_gipa)(
            inst.handle,
            b"vkEnumerateDeviceExtensionProperties\0".as_ptr() as _,
        )
    };
    if next.is_none() {
        return Vec::new();
    }
    let forward: PfnEnumerateDeviceExtensionProperties = unsafe { std::mem::transmute(next) };

    let mut count = 0u32;
    let result =
        unsafe { forward(phys_device, std::ptr::null(), &mut count, std::ptr::null_mut()) };
    if result != vk::Result::SUCCESS {
        return Vec::new();
    }
    let mut props = vec![vk::ExtensionProperties::default(); count as usize];
    let result =
        unsafe { forward(phys_device, std::ptr::null(), &mut count, props.as_mut_ptr()) };
    if result != vk::Result::SUCCESS {
        return Vec::new();
    }
    props
        .iter()
        .map(|p| {
            unsafe { CStr::from_ptr(p.extension_name.as_ptr()) }
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}

// ── Loader link structures ───────────────────────────────────────────────────

const VK_STRUCTURE_TYPE_LOADER_INSTANCE_CREATE_INFO: vk::StructureType =
    vk::StructureType::from_raw(47);

const VK_STRUCTURE_TYPE_LOADER_DEVICE_CREATE_INFO: vk::StructureType =
    vk::StructureType::from_raw(48);

const VK_LAYER_LINK_INFO: u32 = 0;

#[repr(C)]
struct VkLayerInstanceLink {
    p_next: *mut VkLayerInstanceLink,
    pfn_next_get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    pfn_next_get_phys_dev_proc_addr: Option<unsafe extern "system" fn()>,
}

#[repr(C)]
struct VkLayerInstanceCreateInfo {
    s_type: vk::StructureType,
    p_next: *const c_void,
    function: u32,
    u_layer_info: *mut VkLayerInstanceLink,
}

#[repr(C)]
struct VkLayerDeviceLink {
    p_next: *mut VkLayerDeviceLink,
    pfn_next_get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    pfn_next_get_device_proc_addr: vk::PFN_vkGetDeviceProcAddr,
}

#[repr(C)]
struct VkLayerDeviceCreateInfo {
    s_type: vk::StructureType,
    p_next: *const c_void,
    function: u32,
    u_layer_info: *mut VkLayerDeviceLink,
}

unsafe fn find_instance_link(mut p: *const c_void) -> Option<*mut VkLayerInstanceLink> {
    while !p.is_null() {
        let base = unsafe { &*(p as *const vk::BaseInStructure) };
        if base.s_type == VK_STRUCTURE_TYPE_LOADER_INSTANCE_CREATE_INFO {
            let info = unsafe { &*(p as *const VkLayerInstanceCreateInfo) };
            if info.function == VK_LAYER_LINK_INFO && !info.u_layer_info.is_null() {
                return Some(info.u_layer_info);
            }
        }
        p = base.p_next as _;
    }
    None
}

unsafe fn find_device_link(mut p: *const c_void) -> Option<*mut VkLayerDeviceLink> {
    while !p.is_null() {
        let base = unsafe { &*(p as *const vk::BaseInStructure) };
        if base.s_type == VK_STRUCTURE_TYPE_LOADER_DEVICE_CREATE_INFO {
            let info = unsafe { &*(p as *const VkLayerDeviceCreateInfo) };
            if info.function == VK_LAYER_LINK_INFO && !info.u_layer_info.is_null() {
                return Some(info.u_layer_info);
            }
        }
        p = base.p_next as _;
    }
    None
}

unsafe fn advance_instance_link(mut p: *mut c_void) {
    while !p.is_null() {
        let base = unsafe { &mut *(p as *mut vk::BaseOutStructure) };
        if base.s_type == VK_STRUCTURE_TYPE_LOADER_INSTANCE_CREATE_INFO {
            let info = unsafe { &mut *(p as *mut VkLayerInstanceCreateInfo) };
            if info.function == VK_LAYER_LINK_INFO {
                info.u_layer_info = unsafe { (*info.u_layer_info).p_next };
                return;
            }
        }
        p = base.p_next as _;
    }
}

unsafe fn advance_device_link(mut p: *mut c_void) {
    while !p.is_null() {
        let base = unsafe { &mut *(p as *mut vk::BaseOutStructure) };
        if base.s_type == VK_STRUCTURE_TYPE_LOADER_DEVICE_CREATE_INFO {
            let info = unsafe { &mut *(p as *mut VkLayerDeviceCreateInfo) };
            if info.function == VK_LAYER_LINK_INFO {
                info.u_layer_info = unsafe { (*info.u_layer_info).p_next };
                return;
            }
        }
        p = base.p_next as _;
    }
}

// ── Proc-addr routers ────────────────────────────────────────────────────────

#[unsafe(no_mangle)]
pub unsafe extern "system" fn telem_overlay_GetInstanceProcAddr(
    instance: vk::Instance,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    let name = unsafe { CStr::from_ptr(p_name).to_bytes() };
    macro_rules! route {
        ($hook:ident) => {
            return unsafe { std::mem::transmute($hook as *const () as usize) }
        };
    }
    match name {
        b"vkGetInstanceProcAddr" => route!(telem_overlay_GetInstanceProcAddr),
        b"vkGetDeviceProcAddr" => route!(telem_overlay_GetDeviceProcAddr),
        b"vkCreateInstance" => route!(telem_overlay_CreateInstance),
        b"vkDestroyInstance" => route!(telem_overlay_DestroyInstance),
        b"vkCreateDevice" => route!(telem_overlay_CreateDevice),
        b"vkEnumerateInstanceLayerProperties" => {
            route!(telem_overlay_EnumerateInstanceLayerProperties)
        }
        b"vkEnumerateDeviceLayerProperties" => {
            route!(telem_overlay_EnumerateDeviceLayerProperties)
        }
        b"vkEnumerateInstanceExtensionProperties" => {
            route!(telem_overlay_EnumerateInstanceExtensionProperties)
        }
        b"vkEnumerateDeviceExtensionProperties" => {
            route!(telem_overlay_EnumerateDeviceExtensionProperties)
        }
        _ => {}
    }
    if instance == vk::Instance::null() {
        return unsafe { std::mem::transmute(0usize) };
    }
    let key = unsafe { dispatch_key(instance.as_raw()) };
    if let Some(rec) = INSTANCES.lookup(key) {
        unsafe { (rec.next_gipa)(instance, p_name) }
    } else {
        unsafe { std::mem::transmute(0usize) }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn telem_overlay_GetDeviceProcAddr(
    device: vk::Device,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    let name = unsafe { CStr::from_ptr(p_name).to_bytes() };
    macro_rules! route {
        ($hook:ident) => {
            return unsafe { std::mem::transmute($hook as *const () as usize) }
        };
    }
    match name {
        b"vkGetDeviceProcAddr" => route!(telem_overlay_GetDeviceProcAddr),
        b"vkDestroyDevice" => route!(telem_overlay_DestroyDevice),
        b"vkCreateSwapchainKHR" => route!(telem_overlay_CreateSwapchainKHR),
        b"vkDestroySwapchainKHR" => route!(telem_overlay_DestroySwapchainKHR),
        b"vkQueuePresentKHR" => route!(telem_overlay_QueuePresentKHR),
        _ => {}
    }
    let key = unsafe { dispatch_key(device.as_raw()) };
    if let Some(rec) = DEVICES.lookup(key) {
        unsafe { (rec.next_gdpa)(device, p_name) }
    } else {
        unsafe { std::mem::transmute(0usize) }
    }
}

// ── vkCreateInstance / vkDestroyInstance ─────────────────────────────────────

type PfnCreateInstance = unsafe extern "system" fn(
    *const vk::InstanceCreateInfo,
    *const vk::AllocationCallbacks,
    *mut vk::Instance,
) -> vk::Result;

#[unsafe(no_mangle)]
pub unsafe extern "system" fn telem_overlay_CreateInstance(
    p_create_info: *const vk::InstanceCreateInfo,
    p_allocator: *const vk::AllocationCallbacks,
    p_instance: *mut vk::Instance,
) -> vk::Result {
    let link = match unsafe { find_instance_link((*p_create_info).p_next as _) } {
        Some(l) => l,
        None => {
            log::error!("vkCreateInstance: no layer link in pNext chain");
            return vk::Result::ERROR_INITIALIZATION_FAILED;
        }
    };
    let next_gipa = unsafe { (*link).pfn_next_get_instance_proc_addr };
    unsafe { advance_instance_link((*p_create_info).p_next as _) };

    let create_fn: PfnCreateInstance = unsafe {
        std::mem::transmute(next_gipa(
            vk::Instance::null(),
            b"vkCreateInstance\0".as_ptr() as _,
        ))
    };
    let result = unsafe { create_fn(p_create_info, p_allocator, p_instance) };
    if result != vk::Result::SUCCESS {
        return result;
    }

    let instance = unsafe { *p_instance };
    let key = unsafe { dispatch_key(instance.as_raw()) };
    let it = Arc::new(unsafe { InstanceTable::load(instance, next_gipa) });
    let config = OverlayConfig::from_env();

    if let Err(e) = INSTANCES.create(
        key,
        InstanceRecord {
            handle: instance,
            next_gipa,
            it,
            config,
            cpu: Mutex::new(CpuStats::new()),
            device_extensions: OnceCell::new(),
        },
    ) {
        log::error!("vkCreateInstance: {e}");
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }

    log::info!("instance hooked (key={key:#x})");
    vk::Result::SUCCESS
}

type PfnDestroyInstance = unsafe extern "system" fn(vk::Instance, *const vk::AllocationCallbacks);

#[unsafe(no_mangle)]
pub unsafe extern "system" fn telem_overlay_DestroyInstance(
    instance: vk::Instance,
    p_allocator: *const vk::AllocationCallbacks,
) {
    let key = unsafe { dispatch_key(instance.as_raw()) };
    if let Some(rec) = INSTANCES.remove(key) {
        let destroy_fn: PfnDestroyInstance = unsafe {
            std::mem::transmute((rec.next_gipa)(
                instance,
                b"vkDestroyInstance\0".as_ptr() as _,
            ))
        };
        unsafe { destroy_fn(instance, p_allocator) };
        log::info!("instance destroyed (key={key:#x})");
    }
}

// ── vkCreateDevice / vkDestroyDevice ─────────────────────────────────────────

type PfnCreateDevice = unsafe extern "system" fn(
    vk::PhysicalDevice,
    *const vk::DeviceCreateInfo,
    *const vk::AllocationCallbacks,
    *mut vk::Device,
) -> vk::Result;

#[unsafe(no_mangle)]
pub unsafe extern "system" fn telem_overlay_CreateDevice(
    phys_device: vk::PhysicalDevice,
    p_create_info: *const vk::DeviceCreateInfo,
    p_allocator: *const vk::AllocationCallbacks,
    p_device: *mut vk::Device,
) -> vk::Result {
    let link = match unsafe { find_device_link((*p_create_info).p_next as _) } {
        Some(l) => l,
        None => {
            log::error!("vkCreateDevice: no layer link in pNext chain");
            return vk::Result::ERROR_INITIALIZATION_FAILED;
        }
    };
    let next_gdpa = unsafe { (*link).pfn_next_get_device_proc_addr };
    let next_gipa = unsafe { (*link).pfn_next_get_instance_proc_addr };
    unsafe { advance_device_link((*p_create_info).p_next as _) };

    let create_fn: PfnCreateDevice = unsafe {
        std::mem::transmute(next_gipa(
            vk::Instance::null(),
            b"vkCreateDevice\0".as_ptr() as _,
        ))
    };
    let result = unsafe { create_fn(phys_device, p_create_info, p_allocator, p_device) };
    if result != vk::Result::SUCCESS {
        return result;
    }

    let device = unsafe { *p_device };
    let key = unsafe { dispatch_key(device.as_raw()) };

    // Physical devices share the instance's dispatch pointer.
    let inst_key = unsafe { dispatch_key(phys_device.as_raw()) };
    let (instance_id, inst) = match (INSTANCES.id_of(inst_key), INSTANCES.lookup(inst_key)) {
        (Some(id), Some(rec)) => (id, rec),
        _ => {
            log::error!("vkCreateDevice: unknown instance for physical device");
            return vk::Result::ERROR_INITIALIZATION_FAILED;
        }
    };
    let it = inst.it.clone();
    let config = inst.config.clone();

    if !inst.extension_supported(phys_device, "VK_KHR_swapchain") {
        log::warn!("VK_KHR_swapchain not reported by the device, overlay will stay inert");
    }

    let dt = Arc::new(unsafe { DeviceTable::load(device, next_gdpa) });
    let mem_props = unsafe { it.get_physical_device_memory_properties(phys_device) };
    let families = unsafe { it.queue_family_properties(phys_device) };

    // Register every queue the application asked for; vkGetDeviceQueue will
    // hand out handles from this set later.
    let queue_infos = unsafe {
        std::slice::from_raw_parts(
            (*p_create_info).p_queue_create_infos,
            (*p_create_info).queue_create_info_count as usize,
        )
    };
    let mut graphics_family = None;
    let mut graphics_queue = vk::Queue::null();
    let mut queues = Vec::new();
    for info in queue_infos {
        let family = info.queue_family_index;
        let (flags, timestamp_valid_bits) = families
            .get(family as usize)
            .map(|f| (f.queue_flags, f.timestamp_valid_bits))
            .unwrap_or_default();
        for index in 0..info.queue_count {
            let mut queue = vk::Queue::null();
            unsafe { (dt.get_device_queue)(device, family, index, &mut queue) };
            if queue == vk::Queue::null() {
                continue;
            }
            if graphics_family.is_none() && flags.contains(vk::QueueFlags::GRAPHICS) {
                graphics_family = Some(family);
                graphics_queue = queue;
            }
            queues.push((queue, family, flags, timestamp_valid_bits));
        }
    }

    let record = DeviceRecord {
        next_gdpa,
        dt,
        instance: instance_id,
        gpu: GpuSource::select(&config),
        config,
        mem_props,
        graphics_family,
        graphics_queue,
    };
    let device_id = match DEVICES.create(key, record) {
        Ok(id) => id,
        Err(e) => {
            log::error!("vkCreateDevice: {e}");
            return vk::Result::ERROR_INITIALIZATION_FAILED;
        }
    };

    for (queue, family, flags, timestamp_valid_bits) in queues {
        if let Err(e) = QUEUES.create(
            queue.as_raw() as usize,
            QueueRecord {
                device: device_id,
                device_key: key,
                family,
                flags,
                timestamp_valid_bits,
            },
        ) {
            log::warn!("queue registration: {e}");
        }
    }

    let props = unsafe { it.get_physical_device_properties(phys_device) };
    let adapter = unsafe { CStr::from_ptr(props.device_name.as_ptr()) };
    log::info!(
        "device hooked (key={key:#x}, {:?}, graphics family {:?})",
        adapter,
        graphics_family
    );
    vk::Result::SUCCESS
}

type PfnDestroyDevice = unsafe extern "system" fn(vk::Device, *const vk::AllocationCallbacks);

#[unsafe(no_mangle)]
pub unsafe extern "system" fn telem_overlay_DestroyDevice(
    device: vk::Device,
    p_allocator: *const vk::AllocationCallbacks,
) {
    let key = unsafe { dispatch_key(device.as_raw()) };

    // Queues and swapchains go first so no present can race the teardown.
    for queue_key in QUEUES.keys_where(|q| q.device_key == key) {
        QUEUES.remove(queue_key);
    }
    for sc_key in SWAPCHAINS.keys_where(|s| s.device_key == key) {
        SWAPCHAINS.remove(sc_key);
    }

    if let Some(rec) = DEVICES.remove(key) {
        let destroy_fn: PfnDestroyDevice = unsafe {
            std::mem::transmute((rec.next_gdpa)(device, b"vkDestroyDevice\0".as_ptr() as _))
        };
        unsafe { destroy_fn(device, p_allocator) };
        log::info!("device destroyed (key={key:#x})");
    }
}

// ── vkCreateSwapchainKHR / vkDestroySwapchainKHR ─────────────────────────────

/// The overlay draws into the swapchain images; without color-attachment
/// usage on them it stays inert for that swapchain.
fn overlay_renderable(usage: vk::ImageUsageFlags) -> bool {
    usage.contains(vk::ImageUsageFlags::COLOR_ATTACHMENT)
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn telem_overlay_CreateSwapchainKHR(
    device: vk::Device,
    p_create_info: *const vk::SwapchainCreateInfoKHR,
    p_allocator: *const vk::AllocationCallbacks,
    p_swapchain: *mut vk::SwapchainKHR,
) -> vk::Result {
    let dev_key = unsafe { dispatch_key(device.as_raw()) };
    let dev = match DEVICES.lookup(dev_key) {
        Some(d) => d,
        None => return vk::Result::ERROR_INITIALIZATION_FAILED,
    };

    // The application's request goes down the chain untouched.
    let result = unsafe {
        (dev.dt.create_swapchain_khr)(device, p_create_info, p_allocator, p_swapchain)
    };
    if result != vk::Result::SUCCESS {
        return result;
    }

    let swapchain = unsafe { *p_swapchain };
    let sc_key = swapchain.as_raw() as usize;
    let info = unsafe { &*p_create_info };

    // A replaced swapchain may not have been destroyed explicitly.
    if info.old_swapchain != vk::SwapchainKHR::null() {
        SWAPCHAINS.remove(info.old_swapchain.as_raw() as usize);
    }

    if !overlay_renderable(info.image_usage) {
        log::warn!("swapchain {sc_key:#x}: no COLOR_ATTACHMENT usage, overlay disabled");
        return vk::Result::SUCCESS;
    }

    let (Some(graphics_family), device_id) = (dev.graphics_family, DEVICES.id_of(dev_key)) else {
        log::warn!("swapchain {sc_key:#x}: no graphics queue, overlay disabled");
        return vk::Result::SUCCESS;
    };
    let Some(device_id) = device_id else {
        return vk::Result::SUCCESS;
    };

    let images = match unsafe { get_swapchain_images(&dev.dt, device, swapchain) } {
        Ok(v) => v,
        Err(e) => {
            log::error!("vkGetSwapchainImagesKHR failed: {e:?}");
            return vk::Result::SUCCESS;
        }
    };
    let extent = info.image_extent;
    let format = info.image_format;

    let backend = VkRenderBackend::new(
        dev.dt.clone(),
        dev.mem_props,
        graphics_family,
        dev.graphics_queue,
    )
    .and_then(|mut b| {
        b.create_swapchain_resources(&images, format, extent)?;
        Ok(b)
    });
    let backend = match backend {
        Ok(b) => b,
        Err(e) => {
            log::error!("overlay backend setup failed: {e}");
            return vk::Result::SUCCESS;
        }
    };

    let [r, g, b, _] = dev.config.rgba;
    let record = SwapchainRecord {
        device: device_id,
        device_key: dev_key,
        buffer: OverlayBuffer::new(extent.width, extent.height, [r, g, b]),
        stats: Mutex::new(PresentStats::new()),
        backend: Mutex::new(Box::new(backend)),
    };
    if let Err(e) = SWAPCHAINS.create(sc_key, record) {
        log::error!("swapchain registration: {e}");
        return vk::Result::SUCCESS;
    }

    log::info!(
        "swapchain {sc_key:#x} hooked: {}x{} {format:?}, {} images",
        extent.width,
        extent.height,
        images.len()
    );
    vk::Result::SUCCESS
}

#[unsafe(no_mangle)]
pub unsafe extern "system" fn telem_overlay_DestroySwapchainKHR(
    device: vk::Device,
    swapchain: vk::SwapchainKHR,
    p_allocator: *const vk::AllocationCallbacks,
) {
    let dev_key = unsafe { dispatch_key(device.as_raw()) };
    let sc_key = swapchain.as_raw() as usize;

    // Dropping the record tears down the backend before the swapchain the
    // framebuffers point at goes away.
    drop(SWAPCHAINS.remove(sc_key));

    if let Some(dev) = DEVICES.lookup(dev_key) {
        unsafe { (dev.dt.destroy_swapchain_khr)(device, swapchain, p_allocator) };
        log::info!("swapchain {sc_key:#x} destroyed");
    }
}

// ── vkQueuePresentKHR ────────────────────────────────────────────────────────

#[unsafe(no_mangle)]
pub unsafe extern "system" fn telem_overlay_QueuePresentKHR(
    queue: vk::Queue,
    p_present: *const vk::PresentInfoKHR,
) -> vk::Result {
    let queue_rec = QUEUES.lookup(queue.as_raw() as usize);
    let dev = queue_rec.as_ref().and_then(|q| DEVICES.get(q.device));
    let (Some(queue_rec), Some(dev)) = (queue_rec, dev) else {
        // Unknown queue: forward through the device found by dispatch key.
        let key = unsafe { dispatch_key(queue.as_raw()) };
        if let Some(dev) = DEVICES.lookup(key) {
            return unsafe { (dev.dt.queue_present_khr)(queue, p_present) };
        }
        log::error!("vkQueuePresentKHR: no device for queue");
        return vk::Result::ERROR_DEVICE_LOST;
    };

    let present = unsafe { &*p_present };
    let swapchains = unsafe {
        std::slice::from_raw_parts(present.p_swapchains, present.swapchain_count as usize)
    };
    let indices = unsafe {
        std::slice::from_raw_parts(present.p_image_indices, present.swapchain_count as usize)
    };
    let app_waits = if present.p_wait_semaphores.is_null() {
        &[][..]
    } else {
        unsafe {
            std::slice::from_raw_parts(
                present.p_wait_semaphores,
                present.wait_semaphore_count as usize,
            )
        }
    };

    // Drawing needs a graphics-capable queue matching the backend's pool.
    let can_draw = queue_rec.flags.contains(vk::QueueFlags::GRAPHICS)
        && dev.graphics_family == Some(queue_rec.family);

    let mut remaining_waits = app_waits;
    let mut first_failure = vk::Result::SUCCESS;

    for (i, (&sc, &image_index)) in swapchains.iter().zip(indices.iter()).enumerate() {
        let sc_key = sc.as_raw() as usize;
        let record = SWAPCHAINS.lookup(sc_key);

        let mut overlay_wait = vk::Semaphore::null();
        if let Some(record) = record.as_deref() {
            if can_draw {
                unsafe { overlay_frame(&dev, record, queue, image_index, remaining_waits) }
                    .map(|sem| overlay_wait = sem)
                    .unwrap_or_else(|e| log::warn!("overlay draw skipped: {e}"));
            }
        }

        let waits: &[vk::Semaphore] = if overlay_wait != vk::Semaphore::null() {
            std::slice::from_ref(&overlay_wait)
        } else {
            remaining_waits
        };

        let single = vk::PresentInfoKHR::default()
            .wait_semaphores(waits)
            .swapchains(std::slice::from_ref(&sc))
            .image_indices(std::slice::from_ref(&image_index));
        let result = unsafe { (dev.dt.queue_present_khr)(queue, &single) };

        if !present.p_results.is_null() {
            unsafe {
                *present.p_results.add(i) = result;
            }
        }
        if result != vk::Result::SUCCESS && first_failure == vk::Result::SUCCESS {
            first_failure = result;
        }

        // The application's semaphores are consumed by the first submit or
        // present that waits on them.
        remaining_waits = &[];
    }

    first_failure
}

/// One coordinator step for a swapchain being presented: pace the telemetry
/// refresh, regenerate the text when the interval elapsed, and splice the
/// overlay draw into the wait chain. Returns the semaphore the forwarded
/// present must wait on.
unsafe fn overlay_frame(
    dev: &DeviceRecord,
    record: &SwapchainRecord,
    queue: vk::Queue,
    image_index: u32,
    wait_semaphores: &[vk::Semaphore],
) -> Result<vk::Semaphore> {
    let refresh = record.stats.lock().unwrap().tick(Instant::now());
    if refresh {
        let fps = record.stats.lock().unwrap().fps();
        let gpu = dev.gpu.sample();

        let mut writer = record.buffer.begin_write();
        match INSTANCES.get(dev.instance) {
            Some(inst) => {
                let mut cpu = inst.cpu.lock().unwrap();
                cpu.update();
                overlay::write_overlay_text(&mut writer, &dev.config, fps, cpu.core_percents(), gpu);
            }
            None => overlay::write_overlay_text(&mut writer, &dev.config, fps, &[], gpu),
        }
        record.buffer.end_write(writer);
    }

    let tint = [1.0, 1.0, 1.0, dev.config.rgba[3]];
    // Held across the draw recording and submit. Presents on one swapchain
    // are sequential, so no other thread contends for this lock while the
    // driver runs; the registry and overlay-index locks are never held here.
    let mut backend = record.backend.lock().unwrap();
    record.buffer.with_read(|verts| {
        backend.record_and_submit(queue, image_index, verts, tint, wait_semaphores)
    })
}

// ── vkGetSwapchainImagesKHR wrapper ──────────────────────────────────────────

unsafe fn get_swapchain_images(
    dt: &DeviceTable,
    device: vk::Device,
    swapchain: vk::SwapchainKHR,
) -> std::result::Result<Vec<vk::Image>, vk::Result> {
    let mut count = 0u32;
    (unsafe {
        (dt.get_swapchain_images_khr)(device, swapchain, &mut count, std::ptr::null_mut()).result()
    })?;
    let mut images = vec![vk::Image::null(); count as usize];
    (unsafe {
        (dt.get_swapchain_images_khr)(device, swapchain, &mut count, images.as_mut_ptr()).result()
    })?;
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_properties_carry_the_layer_triple() {
        let mut props = vk::LayerProperties::default();
        fill_layer_properties(&mut props);
        let name = unsafe { CStr::from_ptr(props.layer_name.as_ptr()) };
        assert_eq!(name.to_bytes_with_nul(), LAYER_NAME);
        let desc = unsafe { CStr::from_ptr(props.description.as_ptr()) };
        assert_eq!(desc.to_bytes_with_nul(), LAYER_DESCRIPTION);
        assert_eq!(props.implementation_version, 1);
    }

    #[test]
    fn enumerate_layer_two_call_protocol() {
        unsafe {
            let mut count = 0u32;
            assert_eq!(
                enumerate_own_layer(&mut count, std::ptr::null_mut()),
                vk::Result::SUCCESS
            );
            assert_eq!(count, 1);

            let mut props = vk::LayerProperties::default();
            assert_eq!(enumerate_own_layer(&mut count, &mut props), vk::Result::SUCCESS);
            assert_eq!(count, 1);

            let mut zero = 0u32;
            assert_eq!(
                enumerate_own_layer(&mut zero, &mut props),
                vk::Result::INCOMPLETE
            );
        }
    }

    #[test]
    fn overlay_needs_color_attachment_usage() {
        assert!(overlay_renderable(
            vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST
        ));
        assert!(!overlay_renderable(vk::ImageUsageFlags::TRANSFER_DST));
        assert!(!overlay_renderable(vk::ImageUsageFlags::empty()));
    }

    #[test]
    fn dispatch_key_reads_the_first_word() {
        let fake_table = 0xdead_beef_usize;
        let handle = &fake_table as *const usize as u64;
        assert_eq!(unsafe { dispatch_key(handle) }, 0xdead_beef);
    }
}
