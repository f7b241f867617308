use std::any::{self, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;

use crate::error::{Error, Result};

static ID_ALLOC: AtomicUsize = AtomicUsize::new(0);

pub type RpcFuture<T> = BoxFuture<'static, T>;

type Invoke = dyn Fn(&[u8]) -> Result<Vec<u8>> + Send + Sync;

/// Runtime identity of an argument or reply type.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    pub(crate) fn of<T: 'static>() -> TypeTag {
        TypeTag {
            id: TypeId::of::<T>(),
            name: any::type_name::<T>(),
        }
    }
}

struct Method {
    arg: TypeTag,
    reply: TypeTag,
    invoke: Box<Invoke>,
}

/// A type whose methods can be served over a [`Network`](crate::Network).
///
/// Usually implemented through the [`service!`](crate::service) macro.
pub trait Handler: Send + Sync + Sized + 'static {
    /// Service part of `"Service.Method"`. Defaults to the bare type name.
    fn service_name() -> &'static str {
        short_type_name(any::type_name::<Self>())
    }

    /// Adds every method reachable through the network.
    fn register(methods: &mut ServiceBuilder<Self>);
}

fn short_type_name(full: &'static str) -> &'static str {
    let path = full.split('<').next().unwrap_or(full);
    path.rsplit("::").next().unwrap_or(path)
}

pub struct ServiceBuilder<H> {
    name: &'static str,
    handler: Arc<H>,
    methods: HashMap<&'static str, Method>,
}

impl<H: Send + Sync + 'static> ServiceBuilder<H> {
    /// Registers `f` as `method`.
    ///
    /// Only methods shaped `fn(&self, args: A, reply: &mut R)` can be
    /// registered. The handler sees a decoded copy of the caller's argument
    /// and a `Default` reply; whatever it leaves in the reply is encoded back
    /// to the caller.
    pub fn method<A, R, F>(&mut self, method: &'static str, f: F) -> &mut Self
    where
        A: labcodec::Message + 'static,
        R: labcodec::Message + 'static,
        F: Fn(&H, A, &mut R) + Send + Sync + 'static,
    {
        let handler = self.handler.clone();
        let invoke = move |req: &[u8]| -> Result<Vec<u8>> {
            let args: A = labcodec::decode(req).map_err(Error::Decode)?;
            let mut reply = R::default();
            f(&*handler, args, &mut reply);
            let mut buf = vec![];
            labcodec::encode(&reply, &mut buf).map_err(Error::Encode)?;
            Ok(buf)
        };
        self.methods.insert(
            method,
            Method {
                arg: TypeTag::of::<A>(),
                reply: TypeTag::of::<R>(),
                invoke: Box::new(invoke),
            },
        );
        self
    }

    pub fn build(self) -> Service {
        Service {
            name: self.name,
            methods: Arc::new(self.methods),
        }
    }
}

/// A named view over a handler object: its method table is fixed when the
/// service is built.
#[derive(Clone)]
pub struct Service {
    name: &'static str,
    methods: Arc<HashMap<&'static str, Method>>,
}

impl Service {
    /// Builds a service out of every method `H` registers.
    pub fn new<H: Handler>(handler: Arc<H>) -> Service {
        let mut builder = Service::builder(H::service_name(), handler);
        H::register(&mut builder);
        builder.build()
    }

    /// Starts an explicit registration, for handlers without a [`Handler`]
    /// implementation.
    pub fn builder<H: Send + Sync + 'static>(
        name: &'static str,
        handler: Arc<H>,
    ) -> ServiceBuilder<H> {
        ServiceBuilder {
            name,
            handler,
            methods: HashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Registered method names, sorted.
    pub fn methods(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.methods.keys().copied().collect();
        names.sort_unstable();
        names
    }

    fn dispatch(
        &self,
        fq_name: &str,
        method_name: &str,
        arg: TypeTag,
        reply: TypeTag,
        req: &[u8],
    ) -> Result<Vec<u8>> {
        let method = match self.methods.get(method_name) {
            Some(m) => m,
            None => return Err(Error::Unimplemented(format!("unknown {}", fq_name))),
        };
        if method.arg.id != arg.id {
            return Err(Error::TypeMismatch {
                fq_name: fq_name.to_owned(),
                expected: method.arg.name,
                found: arg.name,
            });
        }
        if method.reply.id != reply.id {
            return Err(Error::TypeMismatch {
                fq_name: fq_name.to_owned(),
                expected: method.reply.name,
                found: reply.name,
            });
        }
        (method.invoke)(req)
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("methods", &self.methods())
            .finish()
    }
}

pub(crate) struct ServerCore {
    pub(crate) id: usize,
    services: RwLock<HashMap<&'static str, Service>>,
    count: AtomicUsize,
}

#[derive(Clone)]
pub struct Server {
    pub(crate) core: Arc<ServerCore>,
}

impl Server {
    pub fn new() -> Server {
        Server {
            core: Arc::new(ServerCore {
                id: ID_ALLOC.fetch_add(1, Ordering::Relaxed),
                services: RwLock::new(HashMap::new()),
                count: AtomicUsize::new(0),
            }),
        }
    }

    /// Registers `service` under its name, replacing an older one.
    pub fn add_service(&self, service: Service) {
        let mut services = self.core.services.write().unwrap();
        services.insert(service.name, service);
    }

    /// Number of requests that completed inside this server's handlers.
    pub fn count(&self) -> usize {
        self.core.count.load(Ordering::Relaxed)
    }

    pub(crate) fn dispatch(
        &self,
        fq_name: &str,
        arg: TypeTag,
        reply: TypeTag,
        req: &[u8],
    ) -> Result<Vec<u8>> {
        let (service_name, method_name) = match fq_name.split_once('.') {
            Some(names) => names,
            None => return Err(Error::Unimplemented(format!("unknown {}", fq_name))),
        };
        let service = {
            let services = self.core.services.read().unwrap();
            services.get(service_name).cloned()
        };
        let resp = match service {
            Some(service) => service.dispatch(fq_name, method_name, arg, reply, req)?,
            None => return Err(Error::Unimplemented(format!("unknown {}", fq_name))),
        };
        self.core.count.fetch_add(1, Ordering::Relaxed);
        Ok(resp)
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Server").field("id", &self.core.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Adder;

    impl Adder {
        fn add_one(&self, args: u64, reply: &mut u64) {
            *reply = args + 1;
        }
    }

    fn call<A, R>(server: &Server, fq_name: &str, args: &A) -> Result<R>
    where
        A: labcodec::Message + 'static,
        R: labcodec::Message + 'static,
    {
        let mut buf = vec![];
        labcodec::encode(args, &mut buf).unwrap();
        let resp = server.dispatch(fq_name, TypeTag::of::<A>(), TypeTag::of::<R>(), &buf)?;
        Ok(labcodec::decode(&resp).unwrap())
    }

    fn adder_server() -> Server {
        let mut builder = Service::builder("Adder", Arc::new(Adder));
        builder.method("AddOne", Adder::add_one);
        let server = Server::new();
        server.add_service(builder.build());
        server
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("labrpc::tests::JunkServer"), "JunkServer");
        assert_eq!(short_type_name("Plain"), "Plain");
        assert_eq!(short_type_name("a::Wrapper<b::Inner>"), "Wrapper");
    }

    #[test]
    fn test_dispatch_counts_deliveries() {
        let server = adder_server();
        assert_eq!(call::<u64, u64>(&server, "Adder.AddOne", &41), Ok(42));
        assert_eq!(call::<u64, u64>(&server, "Adder.AddOne", &0), Ok(1));
        assert_eq!(server.count(), 2);
    }

    #[test]
    fn test_dispatch_is_exact() {
        let server = adder_server();
        for name in &["adder.AddOne", "Adder.addOne", "Adder", "Adder.AddOne.x", ""] {
            match call::<u64, u64>(&server, name, &1) {
                Err(Error::Unimplemented(_)) => {}
                other => panic!("{} dispatched to {:?}", name, other),
            }
        }
        assert_eq!(server.count(), 0);
    }

    #[test]
    fn test_dispatch_type_mismatch() {
        let server = adder_server();
        match call::<String, u64>(&server, "Adder.AddOne", &"1".to_owned()) {
            Err(Error::TypeMismatch { expected, .. }) => assert_eq!(expected, "u64"),
            other => panic!("unexpected {:?}", other),
        }
        match call::<u64, String>(&server, "Adder.AddOne", &1) {
            Err(Error::TypeMismatch { found, .. }) => {
                assert_eq!(found, any::type_name::<String>())
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(server.count(), 0);
    }

    #[test]
    fn test_add_service_replaces() {
        let server = adder_server();
        let mut builder = Service::builder("Adder", Arc::new(Adder));
        builder.method("Inc", Adder::add_one);
        server.add_service(builder.build());
        assert!(matches!(
            call::<u64, u64>(&server, "Adder.AddOne", &1),
            Err(Error::Unimplemented(_))
        ));
        assert_eq!(call::<u64, u64>(&server, "Adder.Inc", &1), Ok(2));
    }
}
