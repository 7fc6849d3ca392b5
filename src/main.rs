// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 共享目录 HTML 服务器
//!
//! 该模块实现了基于 Tokio 运行时的多线程内容服务器。
//! 核心功能包括：
//! - 共享根目录（Share Path）的静态内容交付
//! - 存储组（Storage Group）间接挂载：组名映射到根目录之外的内容位置
//! - 脚本页面（qsp/qxml/qjs）的模板渲染
//! - 规范化路径越权检查（抵御目录遍历）
//! - 后台管理控制台（CLI 指令交互）

// --- 模块定义 ---
mod cache;      // 交付层文件内容缓存
mod config;     // 配置解析与管理
mod exception;  // 自定义异常与错误处理
mod param;      // 全局常量与静态参数
mod request;    // HTTP 请求报文解析器与出站槽位
mod resolver;   // 资源解析与分发（核心）
mod response;   // HTTP 响应报文构建器与静态交付
mod scripting;  // 脚本页面模板渲染
mod storage;    // 存储组查找

use config::Config;
use request::Request;
use resolver::HtmlExtension;
use response::Response;

use log::{debug, error, info, warn};
use log4rs;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    runtime::Builder,
};

use std::{
    net::{Ipv4Addr, SocketAddrV4},
    sync::{Arc, Mutex},
    time::Instant,
};

use crate::param::HttpRequestMethod;

/// # 程序入口点
///
/// 初始化系统环境、加载配置并启动主事件循环。
fn main() {
    // 1. 初始化日志系统：采用 log4rs 异步日志架构，通过外部 YAML 灵活配置级别与输出目的地
    log4rs::init_file("config/log4rs.yaml", Default::default()).unwrap();

    // 2. 环境配置加载：从 TOML 文件读取运行参数
    let config = Config::from_toml("config/development.toml");
    info!("配置文件已载入");
    info!("share root: {}", config.share_root());
    for (group, dirs) in config.storage_groups() {
        info!("存储组 {} -> {:?}", group, dirs);
    }

    // 3. 异步运行时定制：根据配置文件动态分配工作线程数
    let worker_threads = config.worker_threads();
    let runtime = Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()
        .unwrap();

    // 4. 共享资源初始化：解析器构造一次，之后对并发请求只读共享
    let extension = Arc::new(HtmlExtension::new(&config));

    runtime.block_on(serve(&config, extension));
}

async fn serve(config: &Config, extension: Arc<HtmlExtension>) {
    // 网络层初始化：支持全地址监听 (0.0.0.0) 或本地回环监听 (127.0.0.1)
    let port: u16 = config.port();
    info!("服务端将在{}端口上监听Socket连接", port);
    let address = match config.local() {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    info!("服务端将在{}地址上监听Socket连接", address);
    let socket = SocketAddrV4::new(address, port);

    let listener = match TcpListener::bind(socket).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("无法绑定端口：{}，错误：{}", port, e);
            panic!("无法绑定端口：{}，错误：{}", port, e);
        }
    };
    info!("端口{}绑定完成", port);

    // 服务器状态与生命周期管理
    // shutdown_flag: 用于优雅停机 (Graceful Shutdown)
    // active_connection: 追踪当前并发连接数
    let shutdown_flag = Arc::new(Mutex::new(false));
    let active_connection = Arc::new(Mutex::new(0u32));

    // 启动交互式管理控制台任务：运行在后台，不阻塞监听循环
    tokio::spawn({
        let shutdown_flag = Arc::clone(&shutdown_flag);
        let active_connection = Arc::clone(&active_connection);
        async move {
            let stdin = tokio::io::stdin();
            let mut reader = BufReader::new(stdin);
            let mut input = String::new();
            loop {
                input.clear();
                if let Ok(_) = reader.read_line(&mut input).await {
                    let cmd = input.trim();
                    match cmd {
                        "stop" => {
                            let mut flag = shutdown_flag.lock().unwrap();
                            *flag = true;
                            println!("停机指令已激活，服务器将在处理完下一个请求后关闭...");
                            break;
                        }
                        "help" => {
                            println!("== Htmlserver Help ==");
                            println!("stop   - 发出停机信号");
                            println!("status - 查看当前服务器运行状态");
                            println!("help   - 显示此帮助信息");
                            println!("=====================");
                        }
                        "status" => {
                            let active_count = *active_connection.lock().unwrap();
                            println!("== Htmlserver 状态 ==");
                            println!("当前活跃连接数: {}", active_count);
                            println!("=====================");
                        }
                        _ => {
                            println!("无效的命令：{}", cmd);
                        }
                    }
                } else {
                    break;
                }
            }
        }
    });

    let mut id: u128 = 0;

    // 主事件循环 (Accept Loop)：持续接收新连接并分发至 Tokio 线程池
    loop {
        if *shutdown_flag.lock().unwrap() {
            info!("主循环接收到停机指令，正在退出...");
            break;
        }

        let (mut stream, addr) = listener.accept().await.unwrap();
        debug!("新的连接：{}", addr);

        let active_connection_arc = Arc::clone(&active_connection);
        let extension_arc = Arc::clone(&extension);

        debug!("[ID{}]TCP连接已建立", id);

        tokio::spawn(async move {
            {
                let mut lock = active_connection_arc.lock().unwrap();
                *lock += 1;
            }

            handle_connection(&mut stream, id, extension_arc).await;

            {
                let mut lock = active_connection_arc.lock().unwrap();
                *lock -= 1;
            }
        });
        id += 1;
    }
}

/// # 连接处理器
///
/// 负责单个 TCP 流的生命周期：读取解析请求、交给解析器处理、构建并发送响应。
async fn handle_connection(stream: &mut TcpStream, id: u128, extension: Arc<HtmlExtension>) {
    let mut buffer = vec![0; 4096];

    // 等待流进入可读状态
    stream.readable().await.unwrap();

    // 尝试非阻塞读取 HTTP 报文
    match stream.try_read(&mut buffer) {
        Ok(0) => return, // 客户端主动关闭连接
        Err(e) => {
            error!("[ID{}]读取TCPStream时遇到错误: {}", id, e);
            return;
        }
        _ => {}
    }
    debug!("[ID{}]HTTP请求接收完毕", id);

    let start_time = Instant::now();

    // 1. 协议解析阶段：将字节流转换为结构化的 Request 对象
    let mut request = match Request::try_from(&buffer, id) {
        Ok(req) => req,
        Err(e) => {
            error!("[ID{}]解析HTTP请求失败: {:?}", id, e);
            let response = "HTTP/1.1 400 Bad Request\r\nContent-Length: 11\r\n\r\nBad Request";
            let _ = stream.write_all(response.as_bytes()).await;
            return;
        }
    };
    debug!("[ID{}]成功解析HTTP请求", id);

    // 2. 资源解析阶段：OPTIONS 预检直接应答，其余交给解析器
    //    解析器对所有请求都报告"已处理"，状态语义体现在响应内容中
    let handled = if request.method() == HttpRequestMethod::Options {
        debug!("[ID{}]请求方法为OPTIONS", id);
        request.set_status_code(204);
        true
    } else {
        extension.process_request(&mut request, id)
    };
    if !handled {
        warn!("[ID{}]请求未被解析器处理", id);
    }

    // 3. 响应构建阶段：把填好的请求上下文序列化为报文
    let response = Response::from_request(&request, id);

    debug!(
        "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
        id,
        start_time.elapsed().as_millis()
    );

    // 4. 结构化日志记录：便于后期审计与性能监控
    info!(
        "[ID{}] {}, {}, {}, {}, {}, {}, ",
        id,
        request.version(),
        request.resource_url(),
        request.method(),
        response.status_code(),
        response.information(),
        request.user_agent(),
    );

    // 5. 数据发送阶段
    let response_bytes = response.as_bytes();
    debug!("[ID{}]发送响应，长度: {}", id, response_bytes.len());
    let _ = stream.write_all(&response_bytes).await;
    let _ = stream.flush().await;
}
