#[macro_use]
extern crate log;

use std::process;
use std::time::Duration;

use anyhow::{anyhow, Result};
use structopt::StructOpt;

use mqtt_client::{Client, ClientOptions, Event, QoS, TcpTransport};

#[derive(StructOpt, Debug)]
#[structopt(name = "sub_client", about = "a device client for subscribing to topics")]
struct Opt {
    /// Specify the host to connect to.
    #[structopt(short, long, default_value = "localhost")]
    host: String,

    /// Connect to the port specified.
    #[structopt(short, long, default_value = "1883")]
    port: u16,

    /// The product id this device belongs to.
    #[structopt(long, default_value = "demo_product")]
    product_id: String,

    /// Provide a prefix that the device name will be built from by
    /// appending the process id of the client.
    #[structopt(short = "I", long, default_value = "sub_client")]
    id_prefix: String,

    /// The credential used to authenticate the device with the broker.
    #[structopt(short, long, default_value = "")]
    credential: String,

    /// The number of seconds between sending PING commands to the broker
    /// for the purposes of informing it we are still connected.
    #[structopt(short, long, default_value = "240")]
    keep_alive: u64,

    /// The MQTT topic to subscribe to.
    #[structopt(short, long)]
    topic: Vec<String>,

    /// Specify the quality of service desired for the incoming messages.
    #[structopt(short, long, default_value = "at-most-once", parse(try_from_str = parse_qos))]
    qos: QoS,

    /// Disconnect and exit the program immediately after the given count of
    /// messages have been received.
    #[structopt(short = "C", long)]
    count: Option<usize>,

    /// Print received messages verbosely, as "topic payload" rather than
    /// just "payload".
    #[structopt(short, long)]
    verbose: bool,
}

fn parse_qos(s: &str) -> Result<QoS> {
    match s {
        "0" | "at-most-once" => Ok(QoS::AtMostOnce),
        "1" | "at-least-once" => Ok(QoS::AtLeastOnce),
        _ => Err(anyhow!("invalid QoS: {} (demo supports 0/1 only)", s)),
    }
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let opt = Opt::from_args();
    debug!("{:#?}", opt);

    let options = ClientOptions {
        product_id: opt.product_id.clone(),
        device_name: format!("{}{}", opt.id_prefix, process::id()),
        credential: opt.credential.clone(),
        host: opt.host.clone(),
        port: opt.port,
        keep_alive: Duration::from_secs(opt.keep_alive),
        ..Default::default()
    };

    let received = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let handler_received = received.clone();
    let verbose = opt.verbose;
    let event_handler = Box::new(move |event: Event| match event {
        Event::SubscribeSuccess { packet_id } => info!("subscribed (packet id {})", packet_id),
        Event::SubscribeNack { packet_id } => warn!("broker refused subscribe (packet id {})", packet_id),
        Event::PublishSuccess { packet_id } => info!("publish acked (packet id {})", packet_id),
        Event::Disconnect => warn!("disconnected, attempting to reconnect"),
        Event::Reconnect => info!("reconnected"),
        Event::PublishReceivedWithoutHandler { message } => {
            handler_received.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            print_message(&message.topic, &message.payload, verbose);
        }
        other => trace!("{:?}", other),
    });

    let client: Client<TcpTransport> = Client::new(options, event_handler)?;

    for topic in &opt.topic {
        client.subscribe(topic, opt.qos, {
            let received = received.clone();
            let verbose = opt.verbose;
            move |message| {
                received.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                print_message(&message.topic, &message.payload, verbose);
            }
        })?;
    }

    loop {
        client.yield_once()?;
        if let Some(count) = opt.count {
            if received.load(std::sync::atomic::Ordering::SeqCst) >= count {
                break;
            }
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    client.disconnect()?;
    Ok(())
}

fn print_message(topic: &str, payload: &[u8], verbose: bool) {
    let text = String::from_utf8_lossy(payload);
    if verbose {
        println!("{} {}", topic, text);
    } else {
        println!("{}", text);
    }
}
