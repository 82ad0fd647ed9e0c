// 服务层模块
//
// - proxy: 同源转发代理

pub mod proxy;

pub use proxy::*;
