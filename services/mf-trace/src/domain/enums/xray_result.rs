//! X 光检测结果

use super::coded_enum;

coded_enum! {
    /// X 光检测结果
    pub enum XRayResult {
        Pass = 1 => "pass",
        Fail = 2 => "fail",
    }
}

impl XRayResult {
    /// 发现异物或有剔除品即判定不合格
    pub fn derive(foreign_body_detected: bool, rejected_count: i32) -> Self {
        if foreign_body_detected || rejected_count > 0 {
            XRayResult::Fail
        } else {
            XRayResult::Pass
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_result() {
        assert_eq!(XRayResult::derive(false, 0), XRayResult::Pass);
        assert_eq!(XRayResult::derive(true, 0), XRayResult::Fail);
        assert_eq!(XRayResult::derive(false, 2), XRayResult::Fail);
    }
}
