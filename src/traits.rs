use crate::errors::Result;

/// 背景除去処理の抽象化
///
/// Implementations take the raw bytes of any supported format and return
/// encoded bytes whose alpha channel separates foreground (opaque) from
/// background (transparent).
pub trait BackgroundRemover: Send + Sync {
    /// 背景を除去した画像をエンコード済みバイト列で返す
    fn remove(&self, bytes: &[u8]) -> Result<Vec<u8>>;
}

impl<R: BackgroundRemover + ?Sized> BackgroundRemover for &R {
    fn remove(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        (**self).remove(bytes)
    }
}

impl<R: BackgroundRemover + ?Sized> BackgroundRemover for Box<R> {
    fn remove(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        (**self).remove(bytes)
    }
}
