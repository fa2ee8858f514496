//! 原生资源句柄组合

use ash::vk;

/// 图像的原生句柄组合
///
/// 资源工厂创建好 image 与 view 之后以此结构体交付；
/// aspect 由创建方根据 format 给出，barrier 的 subresource range 直接使用，
/// 本层不做 format 推断。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GfxImageRef {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub aspect: vk::ImageAspectFlags,
}

impl GfxImageRef {
    /// color aspect 的图像
    #[inline]
    pub const fn color(image: vk::Image, view: vk::ImageView) -> Self {
        Self {
            image,
            view,
            aspect: vk::ImageAspectFlags::COLOR,
        }
    }

    /// depth aspect 的图像
    #[inline]
    pub const fn depth(image: vk::Image, view: vk::ImageView) -> Self {
        Self {
            image,
            view,
            aspect: vk::ImageAspectFlags::DEPTH,
        }
    }

    /// builder
    #[inline]
    pub fn with_aspect(mut self, aspect: vk::ImageAspectFlags) -> Self {
        self.aspect = aspect;
        self
    }
}
