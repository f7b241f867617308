use std::fmt;
use std::sync::Weak;

use futures::channel::oneshot;
use futures::executor::block_on;
use futures::future::{self, FutureExt};
use log::debug;

use crate::error::{Error, Result};
use crate::name::Name;
use crate::network::{Network, NetworkCore};
use crate::server::{RpcFuture, TypeTag};

pub(crate) struct Rpc {
    pub(crate) client_name: Name,
    pub(crate) fq_name: String,
    pub(crate) req: Vec<u8>,
    pub(crate) arg: TypeTag,
    pub(crate) reply: TypeTag,
}

impl fmt::Debug for Rpc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Rpc")
            .field("client_name", &self.client_name)
            .field("fq_name", &self.fq_name)
            .finish()
    }
}

/// A named handle on a [`Network`]. Created by [`Network::create_client`].
///
/// The end does not keep its network alive; once the network is dropped
/// every call fails.
#[derive(Clone)]
pub struct ClientEnd {
    pub(crate) name: Name,
    pub(crate) net: Weak<NetworkCore>,
}

impl ClientEnd {
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Sends `args` to `fq_name` (`"Service.Method"`) and waits for the reply.
    ///
    /// Returns `true` and overwrites `reply` if the handler ran and its reply
    /// made it back. Returns `false` and leaves `reply` alone if the end is
    /// disabled or unconnected, or the request or the reply got lost.
    ///
    /// It blocks the current thread, so do not use it from a future running
    /// on the network's own pool; use [`ClientEnd::call_async`] there.
    ///
    /// # Panics
    ///
    /// Panics if the server has no such service or method, or if `A`/`R` are
    /// not the argument/reply types the method was registered with.
    pub fn call<A, R>(&self, fq_name: &str, args: &A, reply: &mut R) -> bool
    where
        A: labcodec::Message + 'static,
        R: labcodec::Message + 'static,
    {
        match block_on(self.call_async(fq_name, args)) {
            Ok(resp) => {
                *reply = resp;
                true
            }
            Err(e) => {
                debug!("{} call {} failed: {}", self.name, fq_name, e);
                false
            }
        }
    }

    /// Asynchronous flavor of [`ClientEnd::call`].
    ///
    /// All network failures resolve to [`Error::Timeout`], or to
    /// [`Error::Stopped`] once the network is gone. Dispatch errors panic
    /// when the future is polled to completion, as in [`ClientEnd::call`].
    pub fn call_async<A, R>(&self, fq_name: &str, args: &A) -> RpcFuture<Result<R>>
    where
        A: labcodec::Message + 'static,
        R: labcodec::Message + 'static,
    {
        let mut buf = vec![];
        if let Err(e) = labcodec::encode(args, &mut buf) {
            panic!("{} fail to encode args of {}: {:?}", self.name, fq_name, e);
        }
        let core = match self.net.upgrade() {
            Some(core) => core,
            None => return Box::pin(future::err(Error::Stopped)),
        };
        let (tx, rx) = oneshot::channel();
        let rpc = Rpc {
            client_name: self.name.clone(),
            fq_name: fq_name.to_owned(),
            req: buf,
            arg: TypeTag::of::<A>(),
            reply: TypeTag::of::<R>(),
        };
        Network::from_core(core).start_rpc(rpc, tx);

        let fq_name = fq_name.to_owned();
        Box::pin(rx.then(|res| async move {
            let res = match res {
                Ok(Ok(resp)) => labcodec::decode(&resp).map_err(Error::Decode),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(Error::Recv(e)),
            };
            match res {
                Err(e) if !e.is_network_failure() => panic!("fail to call {}: {}", fq_name, e),
                res => res,
            }
        }))
    }
}

impl fmt::Debug for ClientEnd {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ClientEnd")
            .field("name", &self.name)
            .finish()
    }
}
