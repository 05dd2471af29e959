/// Represents a function taking its arguments as one tuple
pub trait FnTrait<Params> {
    type Output;
    fn call(&self, params: Params) -> Self::Output;
}

/// impl `Fn` for `FnTrait`, From 0 parameters to 8 parameters
///
/// for example, it will impl Fn(A, B) like this:
///```ignore
/// impl<Func, Out, A, B> FnTrait<(A, B)> for Func
///    where
///        Func: Fn(A, B) -> Out,
/// {
///    type Output = Out;
///
///    #[inline]
///    #[allow(non_snake_case)]
///    fn call(&self, (A, B): (A, B)) -> Self::Output {
///        (self)(A, B)
///    }
/// }
///```
macro_rules! impl_fn_trait_for_fn ({ $($param:ident)* } => {
    impl<Func, Out, $($param,)*> FnTrait<($($param,)*)> for Func
    where
        Func: Fn($($param),*) -> Out,
    {
        type Output = Out;

        #[inline]
        #[allow(non_snake_case)]
        fn call(&self, ($($param,)*): ($($param,)*)) -> Self::Output {
            (self)($($param,)*)
        }
    }
});

impl_fn_trait_for_fn! {}
impl_fn_trait_for_fn! { A }
impl_fn_trait_for_fn! { A B }
impl_fn_trait_for_fn! { A B C }
impl_fn_trait_for_fn! { A B C D }
impl_fn_trait_for_fn! { A B C D E }
impl_fn_trait_for_fn! { A B C D E F }
impl_fn_trait_for_fn! { A B C D E F G }
impl_fn_trait_for_fn! { A B C D E F G H }
