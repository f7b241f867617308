use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use futures::channel::oneshot;
use futures::executor::ThreadPool;
use futures::future::FutureExt;
use futures::select;
use futures_timer::Delay;
use log::{debug, error};
use rand::{thread_rng, Rng};

use crate::client::{ClientEnd, Rpc};
use crate::config::NetConfig;
use crate::error::{Error, Result};
use crate::name::Name;
use crate::server::Server;

#[derive(Debug)]
struct EndInfo {
    enabled: bool,
    reliable: bool,
    long_reordering: bool,
    server: Option<(Name, Server)>,
}

struct Endpoints {
    // client name -> enabled
    enabled: HashMap<Name, bool>,
    // server name -> server, None once deleted
    servers: HashMap<Name, Option<Server>>,
    // client name -> server name
    connections: HashMap<Name, Option<Name>>,
}

pub(crate) struct NetworkCore {
    config: NetConfig,
    reliable: AtomicBool,
    long_reordering: AtomicBool,
    endpoints: Mutex<Endpoints>,
    count: AtomicUsize,
    worker: ThreadPool,
}

/// The simulated network: every server, every client end and the wires
/// between them.
///
/// Cloning is cheap and every clone refers to the same network.
#[derive(Clone)]
pub struct Network {
    core: Arc<NetworkCore>,
}

impl Network {
    pub fn new() -> Network {
        Network::with_config(NetConfig::default())
    }

    pub fn with_config(config: NetConfig) -> Network {
        let worker = ThreadPool::builder()
            .name_prefix("labrpc-")
            .create()
            .expect("fail to create the network worker pool");
        Network {
            core: Arc::new(NetworkCore {
                config,
                reliable: AtomicBool::new(true),
                long_reordering: AtomicBool::new(false),
                endpoints: Mutex::new(Endpoints {
                    enabled: HashMap::new(),
                    servers: HashMap::new(),
                    connections: HashMap::new(),
                }),
                count: AtomicUsize::new(0),
                worker,
            }),
        }
    }

    pub(crate) fn from_core(core: Arc<NetworkCore>) -> Network {
        Network { core }
    }

    /// Registers `server` as `name`, replacing the server registered under
    /// the same name.
    pub fn add_server<N: Into<Name>>(&self, name: N, server: Server) {
        let name = name.into();
        debug!("add server {} as {:?}", name, server);
        let mut eps = self.core.endpoints.lock().unwrap();
        eps.servers.insert(name, Some(server));
    }

    /// Forgets the server. Calls in flight to it fail, and so do later ones
    /// until another server is added under the same name.
    pub fn delete_server<N: Into<Name>>(&self, name: N) {
        let name = name.into();
        debug!("delete server {}", name);
        let mut eps = self.core.endpoints.lock().unwrap();
        if let Some(s) = eps.servers.get_mut(&name) {
            *s = None;
        }
    }

    /// Creates a client end, unconnected and disabled.
    ///
    /// Reusing a name resets the binding of that name.
    pub fn create_client<N: Into<Name>>(&self, name: N) -> ClientEnd {
        let name = name.into();
        let mut eps = self.core.endpoints.lock().unwrap();
        eps.enabled.insert(name.clone(), false);
        eps.connections.insert(name.clone(), None);
        ClientEnd {
            name,
            net: Arc::downgrade(&self.core),
        }
    }

    /// Connects a client end to a server. The enabled flag is untouched.
    pub fn connect<C: Into<Name>, S: Into<Name>>(&self, client_name: C, server_name: S) {
        let client_name = client_name.into();
        let server_name = server_name.into();
        debug!("connect client {} to server {}", client_name, server_name);
        let mut eps = self.core.endpoints.lock().unwrap();
        eps.connections.insert(client_name, Some(server_name));
    }

    /// Enable/disable a client end.
    pub fn enable<C: Into<Name>>(&self, client_name: C, enabled: bool) {
        let client_name = client_name.into();
        debug!(
            "client {} is {}",
            client_name,
            if enabled { "enabled" } else { "disabled" }
        );
        let mut eps = self.core.endpoints.lock().unwrap();
        eps.enabled.insert(client_name, enabled);
    }

    pub fn set_reliable(&self, yes: bool) {
        self.core.reliable.store(yes, Ordering::Release);
    }

    pub fn set_long_reordering(&self, yes: bool) {
        self.core.long_reordering.store(yes, Ordering::Release);
    }

    /// Number of requests the server handled. 0 for an unknown or deleted
    /// server.
    pub fn count<S: Into<Name>>(&self, server_name: S) -> usize {
        let server_name = server_name.into();
        let eps = self.core.endpoints.lock().unwrap();
        match eps.servers.get(&server_name) {
            Some(Some(server)) => server.count(),
            _ => 0,
        }
    }

    /// Number of calls issued through this network, delivered or not.
    pub fn total_count(&self) -> usize {
        self.core.count.load(Ordering::Relaxed)
    }

    /// Spawns a future to run on this net framework.
    pub fn spawn<F>(&self, f: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.core.worker.spawn_ok(f);
    }

    pub(crate) fn start_rpc(&self, rpc: Rpc, resp: oneshot::Sender<Result<Vec<u8>>>) {
        self.core.count.fetch_add(1, Ordering::Relaxed);
        let net = self.clone();
        self.core.worker.spawn_ok(async move {
            let res = net.process_rpc(rpc).await;
            if let Err(res) = resp.send(res) {
                debug!("caller is gone, drop {:?}", res);
            }
        });
    }

    fn end_info(&self, client_name: &Name) -> EndInfo {
        let eps = self.core.endpoints.lock().unwrap();
        let mut server = None;
        if let Some(Some(server_name)) = eps.connections.get(client_name) {
            if let Some(Some(s)) = eps.servers.get(server_name) {
                server = Some((server_name.clone(), s.clone()));
            }
        }
        EndInfo {
            enabled: eps.enabled.get(client_name).copied().unwrap_or(false),
            reliable: self.core.reliable.load(Ordering::Acquire),
            long_reordering: self.core.long_reordering.load(Ordering::Acquire),
            server,
        }
    }

    fn is_server_dead(&self, client_name: &Name, server_name: &Name, server_id: usize) -> bool {
        let eps = self.core.endpoints.lock().unwrap();
        !eps.enabled.get(client_name).copied().unwrap_or(false)
            || eps.servers.get(server_name).map_or(true, |o| {
                o.as_ref().map(|s| s.core.id != server_id).unwrap_or(true)
            })
    }

    async fn process_rpc(&self, rpc: Rpc) -> Result<Vec<u8>> {
        let config = &self.core.config;
        let end_info = self.end_info(&rpc.client_name);
        debug!("{:?} process with {:?}", rpc, end_info);
        if !end_info.enabled || end_info.server.is_none() {
            // unconnected or disabled, fail right away
            return Err(Error::Timeout);
        }

        if !end_info.reliable {
            let min = config.short_delay_min.as_millis() as u64;
            let max = config.short_delay_max.as_millis() as u64;
            let ms = min + random_below(max.saturating_sub(min));
            Delay::new(Duration::from_millis(ms)).await;
        }

        // The jitter may have outlived the connection.
        let EndInfo {
            enabled,
            reliable,
            long_reordering,
            server,
        } = self.end_info(&rpc.client_name);
        let (server_name, server) = match (enabled, server) {
            (true, Some(s)) => s,
            _ => return Err(Error::Timeout),
        };

        if !reliable && hit(config.request_drop_per_mille) {
            debug!("{:?} request dropped", rpc);
            return Err(Error::Timeout);
        }
        let drop_reply = !reliable && hit(config.reply_drop_per_mille);
        let long_reordering = if long_reordering && hit(config.long_reordering_per_mille) {
            let spread = config.long_reordering_spread.as_millis() as u64;
            let upper_bound = 1 + random_below(spread);
            Some(config.long_reordering_base + Duration::from_millis(random_below(upper_bound)))
        } else {
            None
        };

        deliver(drop_reply, long_reordering, rpc, self.clone(), server_name, server).await
    }
}

/// Runs the handler and carries its reply back through the faults decided
/// for this call.
async fn deliver(
    drop_reply: bool,
    long_reordering: Option<Duration>,
    rpc: Rpc,
    network: Network,
    server_name: Name,
    server: Server,
) -> Result<Vec<u8>> {
    let Rpc {
        client_name,
        fq_name,
        req,
        arg,
        reply,
    } = rpc;

    // A handler may take as long as it likes; it gets a thread of its own so
    // the worker pool keeps serving other calls.
    let (tx, rx) = oneshot::channel();
    let handler_server = server.clone();
    let handler_fq_name = fq_name.clone();
    let spawned = thread::Builder::new()
        .name(format!("labrpc-{}", fq_name))
        .spawn(move || {
            let res = panic::catch_unwind(AssertUnwindSafe(|| {
                handler_server.dispatch(&handler_fq_name, arg, reply, &req)
            }))
            .unwrap_or_else(|payload| {
                Err(Error::HandlerPanicked(format!(
                    "{}: {}",
                    handler_fq_name,
                    panic_message(&*payload)
                )))
            });
            let _ = tx.send(res);
        });
    if let Err(e) = spawned {
        error!("fail to spawn handler thread for {}: {:?}", fq_name, e);
        return Err(Error::Stopped);
    }

    let interval = network.core.config.dead_check_interval;
    let server_id = server.core.id;
    let resp = select! {
        res = rx.fuse() => match res {
            Ok(res) => res,
            Err(e) => {
                error!("handler of {} exited without a reply", fq_name);
                Err(Error::Recv(e))
            }
        },
        _ = server_dead(interval, network.clone(), &client_name, &server_name, server_id).fuse() => {
            Err(Error::Stopped)
        },
    };
    let resp = resp?;

    // The end may have been disabled, or the server deleted or replaced,
    // while the handler ran. As with a real crashed or partitioned peer the
    // reply is lost, even though the handler ran and was counted.
    if network.is_server_dead(&client_name, &server_name, server_id) {
        return Err(Error::Stopped);
    }
    if drop_reply {
        debug!("{} from {} reply dropped", fq_name, client_name);
        return Err(Error::Timeout);
    }
    if let Some(reordering) = long_reordering {
        debug!(
            "{} from {} next long reordering {:?}",
            fq_name, client_name, reordering
        );
        Delay::new(reordering).await;
    }
    Ok(resp)
}

/// Checks if the specified server killed.
///
/// It will return when the server is killed.
async fn server_dead(
    interval: Duration,
    net: Network,
    client_name: &Name,
    server_name: &Name,
    server_id: usize,
) {
    loop {
        Delay::new(interval).await;
        if net.is_server_dead(client_name, server_name, server_id) {
            debug!("{} is dead", server_name);
            return;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

fn hit(per_mille: u32) -> bool {
    thread_rng().gen_range(0..1000) < per_mille
}

fn random_below(upper: u64) -> u64 {
    if upper == 0 {
        0
    } else {
        thread_rng().gen_range(0..upper)
    }
}
