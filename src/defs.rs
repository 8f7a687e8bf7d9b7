use std::sync::LazyLock;

use crate::die::Die;

pub static D2: LazyLock<Die<i32>> = LazyLock::new(|| Die::standard(2));
pub static D3: LazyLock<Die<i32>> = LazyLock::new(|| Die::standard(3));
pub static D4: LazyLock<Die<i32>> = LazyLock::new(|| Die::standard(4));
pub static D6: LazyLock<Die<i32>> = LazyLock::new(|| Die::standard(6));
pub static D8: LazyLock<Die<i32>> = LazyLock::new(|| Die::standard(8));
pub static D10: LazyLock<Die<i32>> = LazyLock::new(|| Die::standard(10));
pub static D12: LazyLock<Die<i32>> = LazyLock::new(|| Die::standard(12));
pub static D20: LazyLock<Die<i32>> = LazyLock::new(|| Die::standard(20));
pub static D100: LazyLock<Die<i32>> = LazyLock::new(|| Die::standard(100));

pub fn d2() -> Die<i32> {
    D2.clone()
}

pub fn d3() -> Die<i32> {
    D3.clone()
}

pub fn d4() -> Die<i32> {
    D4.clone()
}

pub fn d6() -> Die<i32> {
    D6.clone()
}

pub fn d8() -> Die<i32> {
    D8.clone()
}

pub fn d10() -> Die<i32> {
    D10.clone()
}

pub fn d12() -> Die<i32> {
    D12.clone()
}

pub fn d20() -> Die<i32> {
    D20.clone()
}

pub fn d100() -> Die<i32> {
    D100.clone()
}
