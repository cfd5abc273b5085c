use grb::{Model, Result, Var, VarType};
use std::ops::Range;

/// Creation of variable containers shaped like the implementing type, e.g.
/// `(arcs, vehicles).binary(..)` for a `Vec<Vec<Var>>` of binaries.
pub trait AddVars {
    type Out;

    /// Create a variable for any type
    fn vars(
        &self,
        model: &mut Model,
        base_name: &str,
        vtype: VarType,
        bounds: &Range<f64>,
    ) -> Result<Self::Out>;

    /// Binary variables
    fn binary(&self, model: &mut Model, base_name: &str) -> Result<Self::Out> {
        self.vars(
            model,
            base_name,
            VarType::Binary,
            &(f64::NEG_INFINITY..f64::INFINITY),
        )
    }

    /// Bounded integer variables
    fn int(&self, model: &mut Model, base_name: &str, bounds: &Range<f64>) -> Result<Self::Out> {
        self.vars(model, base_name, VarType::Integer, bounds)
    }
}

impl AddVars for usize {
    type Out = Vec<Var>;

    fn vars(
        &self,
        model: &mut Model,
        base_name: &str,
        vtype: VarType,
        bounds: &Range<f64>,
    ) -> Result<Self::Out> {
        let mut vec = Vec::with_capacity(*self);
        for i in 0..*self {
            vec.push(model.add_var(
                &format!("{}_{}", base_name, i),
                vtype,
                0.0,
                bounds.start,
                bounds.end,
                std::iter::empty(),
            )?);
        }

        Ok(vec)
    }
}

impl AddVars for (usize, usize) {
    type Out = Vec<<usize as AddVars>::Out>;

    fn vars(
        &self,
        model: &mut Model,
        base_name: &str,
        vtype: VarType,
        bounds: &Range<f64>,
    ) -> Result<Self::Out> {
        let mut out = Vec::with_capacity(self.0);
        for i in 0..self.0 {
            out.push(
                self.1
                    .vars(model, &format!("{}_{}", base_name, i), vtype, bounds)?,
            )
        }

        Ok(out)
    }
}

/// Trait that converts solved variables to their assigned values
pub trait ConvertVars {
    type Out;
    fn convert(&self, model: &Model) -> grb::Result<Self::Out>;
}

impl<T: ConvertVars> ConvertVars for Vec<T> {
    type Out = Vec<T::Out>;

    fn convert(&self, model: &Model) -> grb::Result<Self::Out> {
        let mut out = Vec::with_capacity(self.len());
        for e in self {
            out.push(e.convert(model)?);
        }
        Ok(out)
    }
}

impl ConvertVars for Var {
    type Out = f64;

    fn convert(&self, model: &Model) -> grb::Result<Self::Out> {
        model.get_obj_attr(grb::attr::X, self)
    }
}
