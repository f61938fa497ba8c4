//! Typed remote functions.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use neutron_core::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{decode, encode, EndpointInfo};
use crate::error::EndpointResult;
use crate::host::{ClientId, FunctionTransport, Origin, Payload, Side, Target};

/// A named, typed request/response channel.
pub struct RemoteFunction<Req, Resp> {
    info: EndpointInfo,
    side: Side,
    transport: Arc<dyn FunctionTransport>,
    _types: PhantomData<fn(Req) -> Resp>,
}

impl<Req, Resp> Clone for RemoteFunction<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            info: self.info.clone(),
            side: self.side,
            transport: Arc::clone(&self.transport),
            _types: PhantomData,
        }
    }
}

impl<Req, Resp> RemoteFunction<Req, Resp>
where
    Req: Serialize + DeserializeOwned + Send + 'static,
    Resp: Serialize + DeserializeOwned + Send + 'static,
{
    pub(crate) fn new(
        info: EndpointInfo,
        side: Side,
        transport: Arc<dyn FunctionTransport>,
    ) -> Self {
        Self {
            info,
            side,
            transport,
            _types: PhantomData,
        }
    }

    /// Names and direction.
    #[must_use]
    pub fn info(&self) -> &EndpointInfo {
        &self.info
    }

    fn invoke(
        &self,
        required: Side,
        target: Target,
        request: &Req,
    ) -> BoxFuture<'static, EndpointResult<Resp>> {
        let prepared = self
            .info
            .require_side(self.side, required)
            .and_then(|()| self.info.require_send(self.side))
            .and_then(|()| encode(request));
        let transport = Arc::clone(&self.transport);
        Box::pin(async move {
            let response = transport.invoke(target, prepared?).await?;
            decode(response)
        })
    }

    /// Calls the server's handler and waits for its answer. Client side only.
    ///
    /// The request is encoded before this returns.
    pub fn invoke_server(&self, request: &Req) -> BoxFuture<'static, EndpointResult<Resp>> {
        self.invoke(Side::Client, Target::Server, request)
    }

    /// Calls a client's handler and waits for its answer. Server side only.
    ///
    /// The client controls whether and when this returns. A client that never
    /// answers stalls the caller forever; there is no timeout. Fails with
    /// [`crate::EndpointError::Disconnected`] if the client leaves first.
    pub fn invoke_client(
        &self,
        client: ClientId,
        request: &Req,
    ) -> BoxFuture<'static, EndpointResult<Resp>> {
        self.invoke(Side::Server, Target::Client(client), request)
    }

    fn serve_with<F>(&self, handler: F)
    where
        F: Fn(Origin, Req) -> BoxFuture<'static, Result<Resp, String>> + Send + Sync + 'static,
    {
        let name = self.info.name.clone();
        self.transport.serve(Arc::new(
            move |origin, payload: Payload| -> BoxFuture<'static, Result<Payload, String>> {
                match decode::<Req>(payload) {
                    Ok(request) => {
                        let response = handler(origin, request);
                        Box::pin(async move {
                            let response = response.await?;
                            encode(&response).map_err(|e| e.to_string())
                        })
                    }
                    Err(e) => {
                        tracing::warn!("Rejected malformed request on {}: {}", name, e);
                        let message = e.to_string();
                        Box::pin(async move { Err(message) })
                    }
                }
            },
        ));
    }

    /// Answers client invocations. Server side only. Replaces any earlier
    /// handler.
    pub fn handle_server<F, Fut>(&self, handler: F) -> EndpointResult<()>
    where
        F: Fn(ClientId, Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Resp> + Send + 'static,
    {
        self.info.require_side(self.side, Side::Server)?;
        self.info.require_receive(self.side)?;
        self.serve_with(move |origin, request| -> BoxFuture<'static, Result<Resp, String>> {
            let Origin::Client(client) = origin else {
                return Box::pin(async { Err("invocation did not come from a client".to_string()) });
            };
            let response = handler(client, request);
            Box::pin(async move { Ok(response.await) })
        });
        Ok(())
    }

    /// Answers server invocations. Client side only. Replaces any earlier
    /// handler.
    pub fn handle_client<F, Fut>(&self, handler: F) -> EndpointResult<()>
    where
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Resp> + Send + 'static,
    {
        self.info.require_side(self.side, Side::Client)?;
        self.info.require_receive(self.side)?;
        self.serve_with(move |_origin, request| -> BoxFuture<'static, Result<Resp, String>> {
            let response = handler(request);
            Box::pin(async move { Ok(response.await) })
        });
        Ok(())
    }
}

impl<Req, Resp> std::fmt::Debug for RemoteFunction<Req, Resp> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFunction")
            .field("info", &self.info)
            .field("side", &self.side)
            .finish_non_exhaustive()
    }
}
