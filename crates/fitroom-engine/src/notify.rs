/// Blocking user-facing failure signal.
pub trait Notifier {
    fn notify(&mut self, message: &str);
}

impl<F> Notifier for F
where
    F: FnMut(&str),
{
    fn notify(&mut self, message: &str) {
        self(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureNotice {
    GarmentEmpty,
    GarmentFailed,
    TryOnEmpty,
    /// Transport or model error during try-on; most often the model's
    /// content-safety filter.
    TryOnFailed,
}

impl FailureNotice {
    pub fn message(self) -> &'static str {
        match self {
            Self::GarmentEmpty => "未生成图片，请重试或修改提示词。",
            Self::GarmentFailed => "生成失败，请重试。",
            Self::TryOnEmpty => "生成换装图片失败，请重试。",
            Self::TryOnFailed => "生成失败，可能因为图片内容安全过滤，请更换图片重试。",
        }
    }
}
