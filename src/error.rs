use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Vulkan error: {0}")]
    Vk(#[from] ash::vk::Result),
    #[error("handle already registered: {0:#x}")]
    AlreadyRegistered(usize),
    #[error("no suitable memory type for bits {0:#x}")]
    NoMemoryType(u32),
}

pub type Result<T> = std::result::Result<T, OverlayError>;
