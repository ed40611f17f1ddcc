/// Square input resolution of the stock YOLO exports.
pub const DEFAULT_INPUT_SIZE: (u32, u32) = (640, 640);

/// Grey used by the upstream letterbox for padding.
pub const LETTERBOX_COLOR: u8 = 114;
