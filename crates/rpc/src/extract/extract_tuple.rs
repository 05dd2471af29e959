use crate::args::Args;
use crate::error::RpcError;
use crate::extract::FromParam;
use crate::route::ParamSpec;

/// Extracts a tuple of handler arguments positionally from the argument array.
pub trait FromArgs: Sized {
    const ARITY: usize;

    /// Verifies at build time that every tuple position can read the parameter declared at
    /// the same position.
    fn check(specs: &[ParamSpec]) -> Result<(), String>;

    fn from_args(args: &Args) -> Result<Self, RpcError>;
}

fn arity_check(args: &Args, arity: usize) -> Result<(), RpcError> {
    if args.len() < arity {
        return Err(RpcError::internal(format!(
            "handler takes {arity} arguments but the route declares {} parameters",
            args.len()
        )));
    }
    Ok(())
}

fn check_arity(specs: &[ParamSpec], arity: usize) -> Result<(), String> {
    if specs.len() < arity {
        return Err(format!("handler takes {arity} arguments but the route declares {} parameters", specs.len()));
    }
    Ok(())
}

fn check_position<T: FromParam>(specs: &[ParamSpec], index: usize) -> Result<(), String> {
    let spec = &specs[index];
    if T::accepts(spec.param_type()) {
        return Ok(());
    }
    Err(format!(
        "argument {index} is a {} and cannot read parameter '{}' of type {}",
        std::any::type_name::<T>(),
        spec.name(),
        spec.param_type()
    ))
}

macro_rules! impl_from_args_for_tuple ({ $arity:literal; $($param:ident $index:tt)* } => {
    impl<$($param,)*> FromArgs for ($($param,)*)
    where
        $($param: FromParam,)*
    {
        const ARITY: usize = $arity;

        fn check(specs: &[ParamSpec]) -> Result<(), String> {
            check_arity(specs, Self::ARITY)?;
            $(check_position::<$param>(specs, $index)?;)*
            Ok(())
        }

        #[allow(unused_variables)]
        fn from_args(args: &Args) -> Result<Self, RpcError> {
            arity_check(args, Self::ARITY)?;
            Ok(($($param::from_param(&args.specs()[$index], &args.values()[$index])?,)*))
        }
    }
});

impl_from_args_for_tuple! { 0; }
impl_from_args_for_tuple! { 1; A 0 }
impl_from_args_for_tuple! { 2; A 0 B 1 }
impl_from_args_for_tuple! { 3; A 0 B 1 C 2 }
impl_from_args_for_tuple! { 4; A 0 B 1 C 2 D 3 }
impl_from_args_for_tuple! { 5; A 0 B 1 C 2 D 3 E 4 }
impl_from_args_for_tuple! { 6; A 0 B 1 C 2 D 3 E 4 F 5 }
impl_from_args_for_tuple! { 7; A 0 B 1 C 2 D 3 E 4 F 5 G 6 }
impl_from_args_for_tuple! { 8; A 0 B 1 C 2 D 3 E 4 F 5 G 6 H 7 }
