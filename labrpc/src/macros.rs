/// Implements [`Handler`](crate::Handler) for a type by listing the methods
/// that are reachable through the network.
///
/// Each `rpc Name(Arg) returns (Reply) => method;` line exposes
/// `fn method(&self, args: Arg, reply: &mut Reply)` as `"<Type>.Name"`.
///
/// ```ignore
/// struct JunkServer;
///
/// impl JunkServer {
///     fn handler2(&self, args: i64, reply: &mut String) {
///         *reply = format!("handler2-{}", args);
///     }
/// }
///
/// labrpc::service! {
///     service JunkServer {
///         rpc Handler2(i64) returns (String) => handler2;
///     }
/// }
/// ```
#[macro_export]
macro_rules! service {
    (
        service $handler:ty {
            $( rpc $method:ident($arg:ty) returns ($reply:ty) => $func:ident; )*
        }
    ) => {
        impl $crate::Handler for $handler {
            fn register(methods: &mut $crate::ServiceBuilder<Self>) {
                $(
                    methods.method::<$arg, $reply, _>(
                        stringify!($method),
                        <$handler>::$func,
                    );
                )*
            }
        }
    };
}
