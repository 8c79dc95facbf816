#[path = "../bin_common.rs"]
mod common;

use clap::{Parser, ValueEnum};
use common::{
    ByteOrderArg, ElementType, WordOrderArg, parse_address, parse_element_type, parse_unit,
    print_value,
};
use modbus_bridge::{
    BridgeConfig, Channel, CoilElement, ElementToChannelConverter, FunctionCode, ModbusElement,
    NumericElement, Priority, StringElement, Task, ValueType, read_task,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_modbus::client::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "modbus-read")]
#[command(about = "Read and decode one Modbus element")]
struct Args {
    /// Modbus TCP server (host:port)
    #[arg(long, conflicts_with = "serial", required_unless_present = "serial")]
    tcp: Option<String>,

    /// Serial port path for Modbus RTU (e.g., /dev/ttyUSB0)
    #[arg(long)]
    serial: Option<String>,

    /// Baud rate
    #[arg(short = 'r', long, default_value_t = modbus_bridge::client::DEFAULT_BAUD_RATE)]
    baud_rate: u32,

    /// Unit id (hex values like 0x01 or decimal)
    #[arg(short, long, value_parser = parse_unit, default_value = "1")]
    unit: u8,

    /// First register or coil
    #[arg(short, long, value_parser = parse_address)]
    address: u16,

    #[arg(short, long, value_enum, default_value_t = Function::Holding)]
    function: Function,

    /// u16, i16, u32, i32, f32, u64, i64, f64 or string:N (N registers)
    #[arg(short = 't', long = "type", value_parser = parse_element_type, default_value = "u16")]
    element_type: ElementType,

    #[arg(long, value_enum, default_value_t = ByteOrderArg::Big)]
    byte_order: ByteOrderArg,

    #[arg(long, value_enum, default_value_t = WordOrderArg::Msw)]
    word_order: WordOrderArg,

    /// Multiply the decoded value by 10^n
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    scale_factor: i8,

    /// Repeat every N seconds until interrupted
    #[arg(short, long)]
    interval: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Function {
    Holding,
    Input,
    Coil,
    Discrete,
}

impl From<Function> for FunctionCode {
    fn from(function: Function) -> Self {
        match function {
            Function::Holding => FunctionCode::ReadHoldingRegisters,
            Function::Input => FunctionCode::ReadInputRegisters,
            Function::Coil => FunctionCode::ReadCoils,
            Function::Discrete => FunctionCode::ReadDiscreteInputs,
        }
    }
}

fn build_element(
    args: &Args,
    function_code: FunctionCode,
) -> Result<(ModbusElement, Arc<Channel>), Box<dyn std::error::Error>> {
    if function_code.accesses_coils() {
        let channel = Channel::read_only("value", ValueType::Bool);
        let element = CoilElement::new(args.address).map(Arc::clone(&channel))?;
        return Ok((element.into(), channel));
    }

    match args.element_type {
        ElementType::String(length) => {
            let channel = Channel::read_only("value", ValueType::String);
            let element = StringElement::new(args.address, length)?
                .with_byte_order(args.byte_order.into())
                .with_word_order(args.word_order.into())
                .map(Arc::clone(&channel))?;
            Ok((element.into(), channel))
        }
        ElementType::Numeric(value_type) => {
            let (channel_type, converter) = match args.scale_factor {
                0 => (value_type, ElementToChannelConverter::Direct),
                n => (ValueType::F64, ElementToChannelConverter::ScaleFactor(n)),
            };
            let channel = Channel::read_only("value", channel_type);
            let element = NumericElement::new(args.address, value_type)?
                .with_byte_order(args.byte_order.into())
                .with_word_order(args.word_order.into())
                .map_with(Arc::clone(&channel), converter)?;
            Ok((element.into(), channel))
        }
    }
}

async fn connect(args: &Args) -> Result<Context, Box<dyn std::error::Error>> {
    if let Some(tcp) = &args.tcp {
        let socket_addr = tokio::net::lookup_host(tcp.as_str())
            .await?
            .next()
            .ok_or_else(|| format!("Cannot resolve {}", tcp))?;
        tracing::info!("Connecting to {}...", socket_addr);
        return Ok(modbus_bridge::client::connect_tcp(socket_addr, args.unit).await?);
    }
    let Some(path) = &args.serial else {
        return Err("Either --tcp or --serial is required".into());
    };
    tracing::info!("Opening {} at {} baud...", path, args.baud_rate);
    Ok(modbus_bridge::client::open_serial(
        path,
        args.baud_rate,
        args.unit,
    )?)
}

async fn poll_once(
    task: &mut Task,
    ctx: &mut Context,
    channel: &Channel,
    config: &BridgeConfig,
) -> bool {
    let ok = read_task(task, ctx, config).await;
    channel.next_process_image();
    print_value(task.start_address(), channel.value().as_ref());
    ok
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();
    let function_code = FunctionCode::from(args.function);
    let (element, channel) = build_element(&args, function_code)?;
    let mut task = Task::new(function_code, args.address, Priority::High, vec![element])?;
    let config = BridgeConfig::default();

    let mut ctx = connect(&args).await?;

    let Some(interval) = args.interval else {
        if !poll_once(&mut task, &mut ctx, &channel, &config).await {
            return Err(format!("Reading {} failed", task.id()).into());
        }
        return Ok(());
    };

    let cancel = CancellationToken::new();
    let cancel_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal");
        cancel_signal.cancel();
    });

    let mut interval = tokio::time::interval(Duration::from_secs(interval.max(1)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = cancel.cancelled() => break,
        }
        poll_once(&mut task, &mut ctx, &channel, &config).await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
